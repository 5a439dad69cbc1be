//! Inter-process sceneset lock.
//!
//! An advisory, exclusive `flock` on `<sceneset-dir>.lock`. The kernel drops
//! the lock when the holding process dies, so a lock file left behind by a
//! killed build never blocks the next one. The file itself is never removed:
//! unlinking a lock file that someone else is waiting on breaks exclusion.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct ScenesetLock {
    file: File,
    path: PathBuf,
}

impl ScenesetLock {
    /// Block until the lock at `path` is ours, creating the lock file if
    /// needed.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut options = OpenOptions::new();
        options.create(true).read(true).write(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // Shared caches are written by many users' jobs.
            options.mode(0o666);
        }
        let file = options.open(&path).or_raise(|| ErrorKind::Lock(path.clone()))?;
        FileExt::lock_exclusive(&file).or_raise(|| ErrorKind::Lock(path.clone()))?;
        tracing::trace!(path = %path.display(), "Acquired sceneset lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScenesetLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to release sceneset lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_lock_excludes_other_holders() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("abc.lock");
        let held = ScenesetLock::acquire(&path).unwrap();

        let (sender, receiver) = mpsc::channel();
        let contender = {
            let path = path.clone();
            std::thread::spawn(move || {
                let lock = ScenesetLock::acquire(path).unwrap();
                sender.send(()).unwrap();
                drop(lock);
            })
        };
        // A separate open file description must not get the lock while it's held.
        assert!(receiver.recv_timeout(Duration::from_millis(200)).is_err());
        drop(held);
        receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        contender.join().unwrap();
    }

    #[test]
    fn test_leftover_lock_file_is_reusable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("abc.lock");
        std::fs::write(&path, b"").unwrap();
        let lock = ScenesetLock::acquire(&path).unwrap();
        assert_eq!(lock.path(), path);
        drop(lock);
        assert!(path.exists());
        ScenesetLock::acquire(&path).unwrap();
    }

    #[test]
    fn test_missing_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = ScenesetLock::acquire(temp_dir.path().join("missing/abc.lock")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Lock(_)));
    }
}
