//! Session lock on the store using flock(2), so two sessions never interleave
//! whole-file rewrites.

use crate::constants;
use crate::util::fs as store_fs;
use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive lock held for the lifetime of a session. Released on drop.
pub struct SessionLock {
    _file: File,
}

impl SessionLock {
    /// Acquire without blocking. Returns `Ok(None)` if another session holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        store_fs::ensure_parent_dir(path)
            .with_context(|| format!("create dir for {}", path.display()))?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("open lock file {}", path.display()))?;
        store_fs::set_permissions(path, constants::STORE_FILE_MODE)
            .with_context(|| format!("set permissions on {}", path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file })),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // fs2 on Linux may return Other instead of WouldBlock
            Err(ref e) if e.raw_os_error() == Some(11) => Ok(None), // EAGAIN
            Err(e) => Err(e).with_context(|| format!("lock {}", path.display())),
        }
    }

    /// Acquire or fail with a user-facing message.
    pub fn acquire(path: &Path) -> Result<Self> {
        match Self::try_acquire(path)? {
            Some(lock) => Ok(lock),
            None => bail!("store is in use by another process ({})", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_lock_file() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("passwords.json.lock");
        let lock = SessionLock::acquire(&lock_path).unwrap();
        assert!(lock_path.exists());
        drop(lock);
    }

    #[test]
    fn test_second_session_is_refused() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("passwords.json.lock");
        let _held = SessionLock::acquire(&lock_path).unwrap();
        assert!(SessionLock::try_acquire(&lock_path).unwrap().is_none());
        let err = SessionLock::acquire(&lock_path).err().unwrap();
        assert!(err.to_string().contains("in use"));
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("passwords.json.lock");
        let _lock = SessionLock::acquire(&lock_path).unwrap();
        let mode = std::fs::metadata(&lock_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, constants::STORE_FILE_MODE);
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("passwords.json.lock");
        {
            let _lock = SessionLock::acquire(&lock_path).unwrap();
        }
        assert!(SessionLock::try_acquire(&lock_path).unwrap().is_some());
    }
}
