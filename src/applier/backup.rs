//! Scoped file snapshots and atomic writes
//!
//! A `FileBackup` is taken before a file is edited. It must be settled with
//! `commit` or `restore`; if it is dropped unsettled the original content
//! is put back.

use crate::errors::{FixError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Snapshot of one file for one edit attempt
#[derive(Debug)]
pub struct FileBackup {
    target: PathBuf,
    backup: PathBuf,
    armed: bool,
}

impl FileBackup {
    /// Copy `target` to a sibling `<name>.<uuid>.backup`
    pub fn create(target: &Path) -> Result<Self> {
        let name = target
            .file_name()
            .ok_or_else(|| FixError::Backup(format!("Not a file: {}", target.display())))?
            .to_string_lossy()
            .into_owned();

        let backup = target.with_file_name(format!("{}.{}.backup", name, Uuid::new_v4().simple()));

        fs::copy(target, &backup).map_err(|e| {
            FixError::Backup(format!("Failed to snapshot {}: {}", target.display(), e))
        })?;

        tracing::debug!(target = %target.display(), backup = %backup.display(), "Snapshot taken");

        Ok(Self {
            target: target.to_path_buf(),
            backup,
            armed: true,
        })
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.backup
    }

    /// Put the snapshot back and remove it
    pub fn restore(mut self) -> Result<()> {
        self.armed = false;
        self.restore_inner()
    }

    /// Accept the edit. The snapshot is kept (and its path returned) or
    /// removed, depending on `keep`.
    pub fn commit(mut self, keep: bool) -> Result<Option<PathBuf>> {
        self.armed = false;
        if keep {
            return Ok(Some(self.backup.clone()));
        }

        fs::remove_file(&self.backup).map_err(|e| {
            FixError::Backup(format!("Failed to discard {}: {}", self.backup.display(), e))
        })?;
        Ok(None)
    }

    fn restore_inner(&self) -> Result<()> {
        let original = fs::read(&self.backup).map_err(|e| {
            FixError::Backup(format!("Failed to read {}: {}", self.backup.display(), e))
        })?;
        write_atomic(&self.target, &original)?;
        fs::remove_file(&self.backup)?;

        tracing::debug!(target = %self.target.display(), "Snapshot restored");
        Ok(())
    }
}

impl Drop for FileBackup {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            if let Err(e) = self.restore_inner() {
                tracing::error!(
                    target = %self.target.display(),
                    backup = %self.backup.display(),
                    error = %e,
                    "Failed to restore snapshot"
                );
            }
        }
    }
}

/// Replace `path` with `contents` via a sibling temp file and rename, so
/// readers never observe a partial write
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| FixError::Generic(format!("Not a file: {}", path.display())))?
        .to_string_lossy()
        .into_owned();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

    let result = (|| -> Result<()> {
        fs::write(&tmp, contents)?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(&tmp, metadata.permissions())?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
