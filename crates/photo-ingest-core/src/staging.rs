use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::fs_ops::copy_preserving_times;
use crate::logging::log_file_error;
use crate::metadata::classify;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::types::{FileOutcome, PhotoRecord, SourceEntry};

/// Records and counters produced by a staging pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedFiles {
    /// One record per staged file, in scan order
    pub records: Vec<PhotoRecord>,
    /// Files that were not images
    pub skipped: usize,
    /// Staged files replaced by a later file with the same base name
    pub overwritten: usize,
}

/// Copies eligible files from the source tree into a flat staging directory
pub struct StagingBuilder<'a, P: ProgressReporter + ?Sized> {
    root: PathBuf,
    staging: PathBuf,
    progress: &'a P,
    staged: StagedFiles,
}

impl<'a, P: ProgressReporter + ?Sized> StagingBuilder<'a, P> {
    /// Start staging files from `root` into the existing, empty `staging` directory
    pub fn new(root: &Path, staging: &Path, progress: &'a P) -> Result<Self> {
        let mut entries = fs::read_dir(staging).with_path("read staging", staging)?;
        if entries.next().is_some() {
            return Err(Error::Configuration(format!(
                "staging directory is not empty: {}",
                staging.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
            staging: staging.to_path_buf(),
            progress,
            staged: StagedFiles::default(),
        })
    }

    /// Classify one file and copy it into staging if it is an eligible image
    pub fn stage_file(&mut self, entry: &SourceEntry) -> FileOutcome {
        let outcome = match classify(&entry.path, &self.root) {
            FileOutcome::Eligible(record) => match self.copy_into_staging(entry, &record) {
                Ok(()) => FileOutcome::Eligible(record),
                Err(e) => FileOutcome::Failed(e),
            },
            other => other,
        };
        self.progress.report(ProgressEvent::FileStaged);
        outcome
    }

    fn copy_into_staging(&mut self, entry: &SourceEntry, record: &PhotoRecord) -> Result<()> {
        let target = self.staging.join(&record.name);
        if target.exists() {
            self.progress.report(ProgressEvent::Overwriting {
                name: record.name.clone(),
            });
            self.staged.overwritten += 1;
        }
        copy_preserving_times(&entry.path, &target).inspect_err(|e| {
            log_file_error(&entry.path, "stage", e);
        })?;
        debug!(
            "Staged {} as {}",
            entry.relative.display(),
            target.display()
        );
        Ok(())
    }

    /// Stage every entry in order, stopping at the first failure
    pub fn build<I>(mut self, entries: I) -> Result<StagedFiles>
    where
        I: IntoIterator<Item = Result<SourceEntry>>,
    {
        for entry in entries {
            let entry = entry?;
            match self.stage_file(&entry) {
                FileOutcome::Eligible(record) => self.staged.records.push(record),
                FileOutcome::Skipped(reason) => {
                    self.staged.skipped += 1;
                    self.progress.report(ProgressEvent::Skipped {
                        name: file_name_lossy(&entry.path),
                        reason,
                    });
                }
                FileOutcome::Failed(e) => return Err(e),
            }
        }
        Ok(self.staged)
    }
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
