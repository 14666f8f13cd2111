//! Single-writer run lock.
//!
//! Overlapping runs against the same state file would lose each other's
//! updates. The lock is an OS advisory lock on a file next to the state
//! file. The file itself stays in place; the kernel drops the lock when the
//! holder exits, so a run killed mid-flight never blocks the next one.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use super::{Result, StorageError};

/// Held for the duration of a run; unlocks on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// Locks the file at `path`, failing with [`StorageError::Locked`] if another
    /// live process holds it.
    pub fn acquire(path: impl Into<PathBuf>, run_id: Uuid) -> Result<Self> {
        let path = path.into();
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
        {
            Ok(file) => file,
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(StorageError::Locked(path)),
            Err(TryLockError::Error(source)) => return Err(StorageError::Io { path, source }),
        }

        // Ownership is already established; the contents are informational.
        let recorded = file
            .set_len(0)
            .and_then(|()| (&file).write_all(format!("{run_id}\n").as_bytes()));
        if let Err(e) = recorded {
            warn!(path = %path.display(), error = %e, "failed to write run id to lock file");
        }

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json.lock");

        let held = RunLock::acquire(&path, Uuid::new_v4()).unwrap();
        let err = RunLock::acquire(&path, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StorageError::Locked(ref p) if p == &path));

        drop(held);
        RunLock::acquire(&path, Uuid::new_v4()).unwrap();
    }

    #[test]
    fn lock_file_left_by_a_killed_run_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json.lock");
        // What a run that never reached `Drop` leaves behind.
        fs::write(&path, "0b5c6a52-dead-4bee-8f00-000000000000\n").unwrap();

        let run_id = Uuid::new_v4();
        let lock = RunLock::acquire(&path, run_id).unwrap();

        assert_eq!(fs::read_to_string(lock.path()).unwrap().trim(), run_id.to_string());
    }

    #[test]
    fn lock_file_records_run_id() {
        let dir = TempDir::new().unwrap();
        let run_id = Uuid::new_v4();

        let lock = RunLock::acquire(dir.path().join("x.lock"), run_id).unwrap();
        let contents = fs::read_to_string(lock.path()).unwrap();

        assert_eq!(contents.trim(), run_id.to_string());
    }
}
