//! Atomic replacement of the source directory by the staging directory.
//!
//! Two strategies exist. When the source is a mount point it cannot be
//! renamed as a unit, so staging lives inside it and the swap clears the
//! source and moves staged files up. Otherwise staging is a sibling and the
//! swap is two renames: source aside to a backup, staging into place.
//!
//! A rename that fails with a busy or cross-device error falls back to a
//! content copy. Any other rename failure restores the backup and removes
//! staging before the error is returned.
//!
//! Directory names are part of the on-disk contract: staging is
//! `<name>_tmp` and backup is `<name>_old`. Either one found before use is
//! leftover state from an interrupted run and gets removed.

use log::{debug, error, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::fs_ops::{
    clear_directory, is_busy_or_cross_device, move_children, remove_dir_if_exists, FileSystem,
    OsFileSystem,
};
use crate::logging::{log_file_error, log_fs_modification};
use crate::types::SwapStrategy;

/// Suffix of the staging directory name
pub const STAGING_SUFFIX: &str = "_tmp";

/// Suffix of the backup directory name
pub const BACKUP_SUFFIX: &str = "_old";

/// Where each directory of a swap lives, decided once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub strategy: SwapStrategy,
    pub source: PathBuf,
    pub staging: PathBuf,
    pub backup: PathBuf,
}

impl SwapPlan {
    /// Lay out the staging and backup paths for `source`
    pub fn new(source: &Path, is_mount_point: bool) -> Result<Self> {
        let name = source.file_name().ok_or_else(|| {
            Error::Configuration(format!(
                "source directory has no final component: {}",
                source.display()
            ))
        })?;
        let parent = source.parent().ok_or_else(|| {
            Error::Configuration(format!(
                "source directory has no parent: {}",
                source.display()
            ))
        })?;

        let mut staging_name = name.to_os_string();
        staging_name.push(STAGING_SUFFIX);
        let mut backup_name = name.to_os_string();
        backup_name.push(BACKUP_SUFFIX);

        let (strategy, staging) = if is_mount_point {
            (SwapStrategy::InPlace, source.join(&staging_name))
        } else {
            (SwapStrategy::Rename, parent.join(&staging_name))
        };

        Ok(Self {
            strategy,
            source: source.to_path_buf(),
            staging,
            backup: parent.join(backup_name),
        })
    }
}

/// Where the swapper is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    Planning,
    Staged,
    Swapping,
    Committed,
    RolledBack,
    /// The swap failed and the original state could not be restored
    Failed,
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planning => "planning",
            Self::Staged => "staged",
            Self::Swapping => "swapping",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a successful commit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub strategy: SwapStrategy,
    /// The rename swap hit a busy/cross-device error and copied contents instead
    pub used_content_copy: bool,
    /// A backup left by an earlier run was removed first
    pub removed_stale_backup: bool,
}

/// Makes a populated staging directory become the source directory
pub struct DirectorySwapper<F: FileSystem = OsFileSystem> {
    fs: F,
    plan: SwapPlan,
    state: SwapState,
}

impl<F: FileSystem> DirectorySwapper<F> {
    /// Plan a swap for `source`, probing mount status through `fs`
    pub fn with_fs(source: &Path, fs: F) -> Result<Self> {
        let source = std::path::absolute(source).with_path("resolve", source)?;
        let is_mount = fs
            .is_mount_point(&source)
            .with_path("check mount point", &source)?;
        let plan = SwapPlan::new(&source, is_mount)?;
        info!(
            "Swap plan for {}: {} (staging: {})",
            plan.source.display(),
            plan.strategy,
            plan.staging.display()
        );
        Ok(Self {
            fs,
            plan,
            state: SwapState::Planning,
        })
    }

    pub fn plan(&self) -> &SwapPlan {
        &self.plan
    }

    pub fn state(&self) -> SwapState {
        self.state
    }

    fn transition(&mut self, next: SwapState) {
        debug!(
            "Swap {}: {} -> {}",
            self.plan.source.display(),
            self.state,
            next
        );
        self.state = next;
    }

    /// Remove a staging directory left by an interrupted run.
    ///
    /// Must run before scanning, since an in-place staging directory sits
    /// inside the source tree.
    pub fn remove_stale_staging(&self) -> Result<bool> {
        let removed = remove_dir_if_exists(&self.plan.staging)?;
        if removed {
            warn!(
                "Removed stale staging directory {}",
                self.plan.staging.display()
            );
        }
        Ok(removed)
    }

    /// Create a fresh, empty staging directory
    pub fn create_staging(&mut self) -> Result<PathBuf> {
        self.remove_stale_staging()?;
        fs::create_dir(&self.plan.staging).with_path("create staging", &self.plan.staging)?;
        log_fs_modification("create_dir", &self.plan.staging, Some("staging"));
        self.transition(SwapState::Staged);
        Ok(self.plan.staging.clone())
    }

    /// Drop the staging directory without touching the source, for runs
    /// that fail before the swap begins
    pub fn discard_staging(&mut self) -> Result<()> {
        remove_dir_if_exists(&self.plan.staging)?;
        self.transition(SwapState::Planning);
        Ok(())
    }

    /// Replace the source directory's contents with the staged files
    pub fn commit(&mut self) -> Result<SwapOutcome> {
        if self.state != SwapState::Staged {
            return Err(Error::Configuration(format!(
                "cannot commit swap in state {}",
                self.state
            )));
        }
        self.transition(SwapState::Swapping);

        match self.plan.strategy {
            SwapStrategy::InPlace => self.swap_in_place(),
            SwapStrategy::Rename => self.swap_by_rename(),
        }
    }

    fn swap_in_place(&mut self) -> Result<SwapOutcome> {
        match self.copy_contents_into_source() {
            Ok(()) => {
                self.transition(SwapState::Committed);
                Ok(SwapOutcome {
                    strategy: SwapStrategy::InPlace,
                    used_content_copy: false,
                    removed_stale_backup: false,
                })
            }
            Err(e) => Err(self.content_swap_failed(e)),
        }
    }

    fn swap_by_rename(&mut self) -> Result<SwapOutcome> {
        let source = self.plan.source.clone();
        let staging = self.plan.staging.clone();
        let backup = self.plan.backup.clone();

        let removed_stale_backup = match remove_dir_if_exists(&backup) {
            Ok(removed) => removed,
            Err(e) => return Err(self.rollback(e)),
        };

        if let Err(e) = self.fs.rename(&source, &backup) {
            return self.handle_rename_failure(e, &source, removed_stale_backup);
        }
        log_fs_modification("rename", &source, Some(&format!("to {}", backup.display())));

        if let Err(e) = self.fs.rename(&staging, &source) {
            return self.handle_rename_failure(e, &staging, removed_stale_backup);
        }
        log_fs_modification("rename", &staging, Some(&format!("to {}", source.display())));

        self.transition(SwapState::Committed);
        remove_dir_if_exists(&backup)?;

        Ok(SwapOutcome {
            strategy: SwapStrategy::Rename,
            used_content_copy: false,
            removed_stale_backup,
        })
    }

    fn handle_rename_failure(
        &mut self,
        err: std::io::Error,
        path: &Path,
        removed_stale_backup: bool,
    ) -> Result<SwapOutcome> {
        log_file_error(path, "rename", &err);

        if !is_busy_or_cross_device(&err) {
            return Err(self.rollback(Error::io("rename", path, err)));
        }

        warn!(
            "Rename of {} not possible ({}); falling back to content copy",
            path.display(),
            err
        );
        match self.content_copy_swap() {
            Ok(()) => {
                self.transition(SwapState::Committed);
                Ok(SwapOutcome {
                    strategy: SwapStrategy::Rename,
                    used_content_copy: true,
                    removed_stale_backup,
                })
            }
            Err(e) => Err(self.content_swap_failed(e)),
        }
    }

    /// Fallback for a rename that cannot complete: put the source back if
    /// it was already moved aside, then swap contents in place
    fn content_copy_swap(&self) -> Result<()> {
        let source = &self.plan.source;
        let backup = &self.plan.backup;

        if !source.exists() {
            if backup.exists() {
                self.fs
                    .rename(backup, source)
                    .with_path("restore backup", backup)?;
                log_fs_modification("rename", backup, Some(&format!("to {}", source.display())));
            } else {
                fs::create_dir(source).with_path("create source", source)?;
            }
        }

        self.copy_contents_into_source()?;
        remove_dir_if_exists(&self.plan.backup)?;
        Ok(())
    }

    fn copy_contents_into_source(&self) -> Result<()> {
        let source = &self.plan.source;
        let staging = &self.plan.staging;

        clear_directory(source, &[staging.as_path()])?;
        let moved = move_children(&self.fs, staging, source)?;
        fs::remove_dir(staging).with_path("remove staging", staging)?;
        log_fs_modification(
            "content_swap",
            source,
            Some(&format!("{} entries", moved.len())),
        );
        Ok(())
    }

    /// The content swap broke partway. Entries may already be gone from the
    /// source, so nothing is restored; staging is kept so no staged file is lost.
    fn content_swap_failed(&mut self, err: Error) -> Error {
        error!(
            "Content swap of {} failed; staged files remain in {}: {}",
            self.plan.source.display(),
            self.plan.staging.display(),
            err
        );
        self.transition(SwapState::Failed);
        Error::ContentSwapFailed {
            source_dir: self.plan.source.clone(),
            staging: self.plan.staging.clone(),
            source: Box::new(err),
        }
    }

    /// Undo a failed rename swap and wrap `err` for the caller
    fn rollback(&mut self, err: Error) -> Error {
        let source = self.plan.source.clone();
        let staging = self.plan.staging.clone();
        let backup = self.plan.backup.clone();

        warn!("Rolling back swap of {}: {}", source.display(), err);

        if !source.exists() && backup.exists() {
            if let Err(e) = self.fs.rename(&backup, &source) {
                log_file_error(&backup, "restore backup", &e);
                self.transition(SwapState::Failed);
                return Error::RollbackFailed {
                    source_dir: source,
                    failure: Box::new(err),
                    rollback: Box::new(Error::io("restore backup", &backup, e)),
                };
            }
            log_fs_modification("rename", &backup, Some(&format!("to {}", source.display())));
        }

        if let Err(e) = remove_dir_if_exists(&staging) {
            self.transition(SwapState::Failed);
            return Error::RollbackFailed {
                source_dir: source,
                failure: Box::new(err),
                rollback: Box::new(e),
            };
        }

        self.transition(SwapState::RolledBack);
        Error::Swap {
            source_dir: source,
            source: Box::new(err),
        }
    }
}
