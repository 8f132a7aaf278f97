use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Error;

/// Supported image formats
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Heic,
    Heif,
    Other(String),
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "heic" => Self::Heic,
            "heif" => Self::Heif,
            other => Self::Other(other.to_string()),
        }
    }

    /// Check if format is on the ingest allow-list
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// A regular file discovered under the source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the source root
    pub relative: PathBuf,

    /// File size in bytes
    pub size: u64,
}

/// Metadata describing one ingested photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Base name of the file in the replaced source directory
    pub name: String,

    /// Immediate subdirectory the file was found in, if exactly one level deep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Year parsed from an 8-digit date in the filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Why a scanned file was left out of the ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is not on the image allow-list
    NotAnImage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnImage => write!(f, "non-image file"),
        }
    }
}

/// Result of processing a single scanned file
#[derive(Debug)]
pub enum FileOutcome {
    /// The file is an image and produced a record
    Eligible(PhotoRecord),

    /// The file is not ingested; the run continues
    Skipped(SkipReason),

    /// The file could not be processed; the run aborts
    Failed(Error),
}

/// How the source directory gets replaced by the staging directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapStrategy {
    /// Source is a mount point: clear it and move staged files in
    InPlace,

    /// Rename source aside and rename staging into its place
    Rename,
}

impl fmt::Display for SwapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InPlace => write!(f, "in-place"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

/// Summary of a completed ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Regular files found under the source directory
    pub files_scanned: usize,

    /// Records handed to the store
    pub records_inserted: usize,

    /// Files left out because they are not images
    pub files_skipped: usize,

    /// Staged files overwritten by a later file with the same base name
    pub names_overwritten: usize,

    /// Whether existing records were cleared before the insert
    pub cleared_existing: bool,

    /// Strategy used to replace the directory, `None` when nothing was swapped
    pub strategy: Option<SwapStrategy>,

    /// Whether the rename swap fell back to copying contents
    pub used_content_copy: bool,
}
