//! File-based locking to keep two passes from overlapping
//!
//! The backup core does not lock; the CLI takes this lock around a pass.

use anyhow::{Context, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOCK_FILE_NAME: &str = ".db-backup-manager.lock";

/// Advisory lock file inside the backup directory
pub struct PassLock {
    lock: RwLock<File>,
    lock_path: PathBuf,
}

impl PassLock {
    /// Open (or create) the lock file in `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .context(format!("Failed to create lock directory: {:?}", dir))?;

        let lock_path = dir.join(LOCK_FILE_NAME);
        debug!("Opening lock file: {:?}", lock_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .context(format!("Failed to open lock file: {:?}", lock_path))?;

        Ok(Self {
            lock: RwLock::new(file),
            lock_path,
        })
    }

    /// Take the exclusive lock without waiting.
    ///
    /// Fails if another pass currently holds it. Released when the guard drops.
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        let guard = self.lock.try_write().context(format!(
            "Another backup pass is already running (lock held: {:?})",
            self.lock_path
        ))?;

        info!("Acquired pass lock: {:?}", self.lock_path);
        Ok(guard)
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}
