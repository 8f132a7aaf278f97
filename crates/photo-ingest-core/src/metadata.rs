//! Eligibility and attribute extraction for scanned files.
//!
//! Everything here is a pure function of a path and the source root; no
//! filesystem access happens in this module.

use std::path::{Component, Path};

use crate::error::Error;
use crate::types::{FileOutcome, ImageFormat, PhotoRecord, SkipReason};

/// Years below this are treated as noise rather than dates
pub const MIN_YEAR: i32 = 1970;

const DATE_TOKEN_LEN: usize = 8;

/// Get image format from file extension
fn get_image_format(path: &Path) -> Option<ImageFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(ImageFormat::from_extension)
}

/// Returns if the given path has an extension on the image allow-list
pub fn has_image_extension(path: &Path) -> bool {
    get_image_format(path).is_some_and(|format| format.is_supported())
}

/// Extract a year from the standalone 8-digit runs in `filename`.
///
/// A run must not touch other digits on either side. Runs are tried left to
/// right and the first whose leading four digits reach [`MIN_YEAR`] wins.
pub fn extract_year(filename: &str) -> Option<i32> {
    let bytes = filename.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start == DATE_TOKEN_LEN {
            let year: i32 = filename[start..start + 4].parse().ok()?;
            if year >= MIN_YEAR {
                return Some(year);
            }
        }
    }
    None
}

/// The immediate subdirectory of `path` under `root`, when the file sits
/// exactly one level below it (`root/<group>/<file>`).
pub fn extract_group(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let group = match components.next()? {
        Component::Normal(name) => name.to_str()?,
        _ => return None,
    };
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(group.to_string()),
        _ => None,
    }
}

/// Classify a single file and build its record if it is an eligible image
pub fn classify(path: &Path, root: &Path) -> FileOutcome {
    if !has_image_extension(path) {
        return FileOutcome::Skipped(SkipReason::NotAnImage);
    }

    if path.strip_prefix(root).is_err() {
        return FileOutcome::Failed(Error::InvalidEntry {
            path: path.to_path_buf(),
            reason: format!("not under {}", root.display()),
        });
    }

    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_string(),
        None => {
            return FileOutcome::Failed(Error::InvalidEntry {
                path: path.to_path_buf(),
                reason: "file name is not valid UTF-8".to_string(),
            })
        }
    };

    FileOutcome::Eligible(PhotoRecord {
        year: extract_year(&name),
        group: extract_group(path, root),
        name,
    })
}
