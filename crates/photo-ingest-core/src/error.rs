use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the photo-ingest library
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem operation error, tagged with the operation and path
    #[error("I/O error during {op} on {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory not found error
    #[error("Directory not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A scanned entry could not be turned into a record
    #[error("Invalid entry {}: {reason}", .path.display())]
    InvalidEntry { path: PathBuf, reason: String },

    /// The record store rejected an operation
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// The swap failed and the original directory was restored
    #[error("Directory swap failed for {}, original contents restored: {source}", .source_dir.display())]
    Swap {
        source_dir: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A content swap stopped partway; the staged files are still in `staging`
    #[error(
        "Content swap into {} failed, staged files kept in {}: {source}",
        .source_dir.display(),
        .staging.display()
    )]
    ContentSwapFailed {
        source_dir: PathBuf,
        staging: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// The swap failed and the rollback could not complete either
    #[error(
        "Directory swap failed for {} and rollback did not complete: {failure}; rollback error: {rollback}",
        .source_dir.display()
    )]
    RollbackFailed {
        source_dir: PathBuf,
        failure: Box<Error>,
        rollback: Box<Error>,
    },
}

impl Error {
    /// Wrap an [`std::io::Error`] with the operation and path that produced it
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Attach operation and path context to `io::Result`s
pub(crate) trait IoResultExt<T> {
    fn with_path(self, op: &'static str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, op: &'static str, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| Error::io(op, path, e))
    }
}
