//! Atomic placement of downloaded files.
//!
//! Bytes are streamed into a hidden temporary file next to the destination
//! and only renamed onto the destination once everything has been written
//! and synced. A reader (or a symlink) looking at the destination sees either
//! nothing or the complete file, never a partial one.

use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

pub struct StagedFile {
    // Removes the temporary file from disk if dropped before `commit()`.
    temp: NamedTempFile,
    file: File,
    destination: PathBuf,
    written: u64,
}

impl StagedFile {
    /// Start staging a file for `destination`, creating its parent
    /// directories as needed.
    pub async fn create(destination: impl Into<PathBuf>) -> Result<Self> {
        let destination = destination.into();
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).await.map_err(|e| ErrorKind::from_io(e, &parent))?;
        let temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(&parent)
            .map_err(|e| ErrorKind::from_io(e, &parent))?;
        let file = temp.as_file().try_clone().map_err(ErrorKind::Io)?;
        Ok(Self {
            temp,
            file: File::from_std(file),
            destination,
            written: 0,
        })
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await.map_err(ErrorKind::Io)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Flush, sync, and rename onto the destination. Returns the number of
    /// bytes written.
    pub async fn commit(mut self) -> Result<u64> {
        self.file.flush().await.map_err(ErrorKind::Io)?;
        self.file.sync_all().await.map_err(ErrorKind::Io)?;
        let Self { temp, destination, written, .. } = self;
        temp.persist(&destination).map_err(|e| ErrorKind::from_io(e.error, &destination))?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_places_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("nested/dir/a.usdz");
        let mut staged = StagedFile::create(&destination).await.unwrap();
        staged.write(b"hello ").await.unwrap();
        staged.write(b"world").await.unwrap();
        // Nothing visible under the final name until commit.
        assert!(!destination.exists());
        assert_eq!(staged.commit().await.unwrap(), 11);
        assert_eq!(std::fs::read(&destination).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_drop_leaves_nothing_behind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("a.usdz");
        let mut staged = StagedFile::create(&destination).await.unwrap();
        staged.write(b"partial").await.unwrap();
        drop(staged);
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
