use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::SourceEntry;

/// Enumerates regular files under a source directory in a stable order.
///
/// Every call to [`FileScanner::files`] starts a fresh walk, so the scanner
/// can be iterated any number of times. Entries come back sorted by path
/// component, which keeps logs and tests reproducible across runs.
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    /// Create a scanner for `root`, failing if the directory does not exist
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::FileNotFound(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Lazily walk the tree, yielding regular files only
    pub fn files(&self) -> impl Iterator<Item = Result<SourceEntry>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(self.to_source_entry(&entry)),
                Ok(_) => None,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    let io = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                    Some(Err(Error::io("scan", path, io)))
                }
            })
    }

    /// Collect the full walk, stopping at the first error
    pub fn collect(&self) -> Result<Vec<SourceEntry>> {
        self.files().collect()
    }

    fn to_source_entry(&self, entry: &walkdir::DirEntry) -> Result<SourceEntry> {
        let path = entry.path().to_path_buf();
        let size = entry
            .metadata()
            .map_err(|e| {
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata unavailable"));
                Error::io("metadata", &path, io)
            })?
            .len();
        let relative = path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| Error::InvalidEntry {
                path: path.clone(),
                reason: format!("not under {}", self.root.display()),
            })?;

        Ok(SourceEntry {
            path,
            relative,
            size,
        })
    }
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn create_test_file(dir: &Path, name: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let file_path = dir.join(name);
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"DUMMY IMAGE DATA").unwrap();
        file_path
    }

    #[test]
    fn test_scan_is_sorted_and_recursive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        create_test_file(root, "b.jpg");
        create_test_file(&root.join("a"), "z.png");
        create_test_file(root, "a.jpg");
        create_test_file(&root.join("a").join("deep"), "x.gif");

        let scanner = FileScanner::new(root).unwrap();
        let relative: Vec<PathBuf> = scanner
            .collect()
            .unwrap()
            .into_iter()
            .map(|e| e.relative)
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/deep/x.gif"),
                PathBuf::from("a/z.png"),
                PathBuf::from("a.jpg"),
                PathBuf::from("b.jpg"),
            ]
        );
    }

    #[test]
    fn test_scan_is_restartable() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "one.jpg");
        create_test_file(&dir.path().join("sub"), "two.txt");

        let scanner = FileScanner::new(dir.path()).unwrap();
        let first = scanner.collect().unwrap();
        let second = scanner.collect().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].size, 16);
    }

    #[test]
    fn test_scan_excludes_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty").join("nested")).unwrap();

        let scanner = FileScanner::new(dir.path()).unwrap();
        assert!(scanner.collect().unwrap().is_empty());
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        let result = FileScanner::new("/path/that/does/not/exist");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
