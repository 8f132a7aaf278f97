//! Filesystem primitives shared by staging and the directory swap.

use filetime::FileTime;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, Result};
use crate::logging::log_fs_modification;

/// The operations the directory swap needs to vary in tests
pub trait FileSystem {
    /// Rename `from` to `to` in a single step
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Whether `path` is the root of a mounted filesystem
    fn is_mount_point(&self, path: &Path) -> io::Result<bool>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn is_mount_point(&self, path: &Path) -> io::Result<bool> {
        (**self).is_mount_point(path)
    }
}

/// The real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    #[cfg(unix)]
    fn is_mount_point(&self, path: &Path) -> io::Result<bool> {
        use std::os::unix::fs::MetadataExt;

        let meta = fs::symlink_metadata(path)?;
        if meta.file_type().is_symlink() {
            return Ok(false);
        }
        let parent = fs::symlink_metadata(path.join(".."))?;
        // A different device, or `..` resolving to the same inode (`/`)
        Ok(meta.dev() != parent.dev() || meta.ino() == parent.ino())
    }

    #[cfg(not(unix))]
    fn is_mount_point(&self, path: &Path) -> io::Result<bool> {
        Ok(path.parent().is_none())
    }
}

/// Busy-device and cross-device failures, which a content copy can work around
pub fn is_busy_or_cross_device(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ResourceBusy | ErrorKind::CrossesDevices
    ) || is_busy_or_cross_device_code(err.raw_os_error())
}

#[cfg(unix)]
fn is_busy_or_cross_device_code(code: Option<i32>) -> bool {
    matches!(code, Some(c) if c == libc::EBUSY || c == libc::EXDEV)
}

#[cfg(not(unix))]
fn is_busy_or_cross_device_code(_code: Option<i32>) -> bool {
    false
}

/// Copy a file's bytes and permissions, then carry over its access and modification times
pub fn copy_preserving_times(from: &Path, to: &Path) -> Result<u64> {
    let bytes = fs::copy(from, to).with_path("copy", from)?;
    let meta = fs::metadata(from).with_path("metadata", from)?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .with_path("set times", to)?;
    Ok(bytes)
}

/// Remove a directory tree if it exists; returns whether anything was removed
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path).with_path("remove directory", path)?;
            log_fs_modification("remove_dir_all", path, None);
            Ok(true)
        }
        Ok(_) => {
            fs::remove_file(path).with_path("remove file", path)?;
            log_fs_modification("remove_file", path, None);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(crate::Error::io("inspect", path, e)),
    }
}

/// Remove every entry of `dir` except the paths in `keep`
pub fn clear_directory(dir: &Path, keep: &[&Path]) -> Result<()> {
    for entry in fs::read_dir(dir).with_path("read directory", dir)? {
        let entry = entry.with_path("read directory", dir)?;
        let path = entry.path();
        if keep.iter().any(|k| *k == path) {
            continue;
        }
        let file_type = entry.file_type().with_path("inspect", &path)?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).with_path("remove directory", &path)?;
        } else {
            fs::remove_file(&path).with_path("remove file", &path)?;
        }
    }
    log_fs_modification("clear_directory", dir, Some(&format!("kept {}", keep.len())));
    Ok(())
}

/// Move one entry, copying then deleting when a rename cannot cross devices
pub fn move_entry<F: FileSystem>(fs_impl: &F, from: &Path, to: &Path) -> Result<()> {
    match fs_impl.rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_busy_or_cross_device(&e) && from.is_file() => {
            copy_preserving_times(from, to)?;
            fs::remove_file(from).with_path("remove file", from)?;
            Ok(())
        }
        Err(e) => Err(crate::Error::io("move", from, e)),
    }
}

/// Move every entry of `from` into `into`, keeping base names; returns the moved names
pub fn move_children<F: FileSystem>(fs_impl: &F, from: &Path, into: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(from)
        .with_path("read directory", from)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .with_path("read directory", from)?;
    entries.sort();

    let mut moved = Vec::with_capacity(entries.len());
    for path in entries {
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = into.join(name);
        move_entry(fs_impl, &path, &target)?;
        moved.push(target);
    }
    log_fs_modification(
        "move_children",
        into,
        Some(&format!("{} entries from {}", moved.len(), from.display())),
    );
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    struct CrossDeviceFs;

    impl FileSystem for CrossDeviceFs {
        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::CrossesDevices, "injected"))
        }

        fn is_mount_point(&self, _path: &Path) -> io::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"DATA").unwrap();
        let old = SystemTime::now() - Duration::from_secs(86_400 * 30);
        filetime::set_file_mtime(&src, FileTime::from_system_time(old)).unwrap();

        let dst = dir.path().join("b.jpg");
        assert_eq!(copy_preserving_times(&src, &dst).unwrap(), 4);

        let src_mtime = FileTime::from_last_modification_time(&fs::metadata(&src).unwrap());
        let dst_mtime = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(src_mtime, dst_mtime);
    }

    #[test]
    fn test_clear_directory_keeps_listed_entries() {
        let dir = tempdir().unwrap();
        let keep = dir.path().join("keep");
        fs::create_dir(&keep).unwrap();
        fs::write(keep.join("x.jpg"), b"x").unwrap();
        fs::write(dir.path().join("gone.txt"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();

        clear_directory(dir.path(), &[keep.as_path()]).unwrap();

        let remaining: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(remaining, vec![keep.clone()]);
        assert!(keep.join("x.jpg").exists());
    }

    #[test]
    fn test_move_entry_falls_back_to_copy_across_devices() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        fs::write(&src, b"DATA").unwrap();

        move_entry(&CrossDeviceFs, &src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"DATA");
    }

    #[test]
    fn test_remove_dir_if_exists() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("stale_tmp");
        assert!(!remove_dir_if_exists(&target).unwrap());

        fs::create_dir_all(target.join("inner")).unwrap();
        assert!(remove_dir_if_exists(&target).unwrap());
        assert!(!target.exists());
    }

    #[test]
    fn test_error_classification() {
        assert!(is_busy_or_cross_device(&io::Error::new(
            ErrorKind::ResourceBusy,
            "busy"
        )));
        assert!(is_busy_or_cross_device(&io::Error::new(
            ErrorKind::CrossesDevices,
            "xdev"
        )));
        assert!(!is_busy_or_cross_device(&io::Error::new(
            ErrorKind::PermissionDenied,
            "denied"
        )));
        #[cfg(unix)]
        assert!(is_busy_or_cross_device(&io::Error::from_raw_os_error(
            libc::EXDEV
        )));
    }
}
