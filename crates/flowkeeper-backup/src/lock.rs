//! Exclusive advisory lock around index mutations

use crate::error::{BackupError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use tracing::debug;

/// Held for the duration of a read-modify-write of the archive.
///
/// The lock is released when the guard is dropped and the file handle closed.
#[derive(Debug)]
pub struct ArchiveLock {
    _file: File,
    path: Utf8PathBuf,
}

impl ArchiveLock {
    /// Block (on a worker thread) until the lock is granted.
    pub async fn acquire(path: &Utf8Path) -> Result<Self> {
        let lock_path = path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| BackupError::io(path, std::io::Error::other(e)))?
        .map_err(|e| BackupError::io(path, e))?;

        debug!("Acquired archive lock {}", path);
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        debug!("Released archive lock {}", self.path);
    }
}
