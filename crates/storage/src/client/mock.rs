//! In-memory repository clients for testing.

use crate::client::{DatasetHub, ObjectStore, Transfer};
use crate::error::{ErrorKind, Result};
use crate::{ObjectPath, StagedFile, validate_path};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio::sync::RwLock;

/// In-memory object store.
///
/// Objects are keyed by their `bucket/key` form. Every completed transfer is
/// counted, so tests can assert that a second run fetched nothing.
///
/// # Examples
///
/// ```
/// use sceneset_storage::ObjectPath;
/// use sceneset_storage::client::{MockObjectStore, ObjectStore, Transfer};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockObjectStore::with_objects([("bucket/a.usdz", b"bytes")]);
/// let dir = tempfile::tempdir()?;
/// let destination = dir.path().join("a.usdz");
/// let object = ObjectPath::parse("bucket/a.usdz")?;
/// assert_eq!(store.download(&object, &destination).await?, Transfer::Downloaded(5));
/// assert_eq!(store.download(&object, &destination).await?, Transfer::Skipped);
/// assert_eq!(store.transfers(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockObjectStore {
    name: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    transfers: AtomicUsize,
}

impl MockObjectStore {
    /// Create a mock store pre-populated with objects.
    ///
    /// Panics if any locator fails to parse. If test setup is wrong, then
    /// test should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (locator, data) in objects {
            let Ok(object) = ObjectPath::parse(locator.as_ref()) else {
                // The panic here is DELIBERATE. There is no error result.
                panic!("MockObjectStore::with_objects: invalid locator {}", locator.as_ref());
            };
            map.insert(object.to_string(), data.into());
        }
        Self {
            name: "mock".to_string(),
            objects: RwLock::new(map),
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of downloads that actually transferred bytes.
    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}
impl Default for MockObjectStore {
    fn default() -> Self {
        let objects: [(&str, &[u8]); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self, object: &ObjectPath, destination: &Path) -> Result<Transfer> {
        if fs::try_exists(destination).await.map_err(|e| ErrorKind::from_io(e, destination))? {
            return Ok(Transfer::Skipped);
        }
        let data = self
            .objects
            .read()
            .await
            .get(&object.to_string())
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(object.to_string())))?;
        let mut staged = StagedFile::create(destination).await?;
        staged.write(&data).await?;
        let written = staged.commit().await?;
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(Transfer::Downloaded(written))
    }
}

/// In-memory hosted dataset.
///
/// Files are keyed by their path relative to the dataset root.
pub struct MockDatasetHub {
    name: String,
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    transfers: AtomicUsize,
}

impl MockDatasetHub {
    /// Create a mock dataset pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal).
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockDatasetHub::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            files: RwLock::new(map),
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of files downloaded so far.
    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}
impl Default for MockDatasetHub {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl DatasetHub for MockDatasetHub {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self, filename: &Path, local_dir: &Path) -> Result<PathBuf> {
        let filename = validate_path(filename)?;
        let data = self
            .files
            .read()
            .await
            .get(&filename)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(filename.display().to_string())))?;
        let mut staged = StagedFile::create(local_dir.join(&filename)).await?;
        staged.write(&data).await?;
        let destination = staged.destination().to_path_buf();
        staged.commit().await?;
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_object_store_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MockObjectStore::default();
        let err = store
            .download(&ObjectPath::new("bucket", "missing.usdz"), &temp_dir.path().join("a.usdz"))
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert_eq!(store.transfers(), 0);
    }

    #[tokio::test]
    async fn test_dataset_download_preserves_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hub = MockDatasetHub::with_files([("clips/v1/a.usdz", b"zip".to_vec())]);
        let path = hub.download(Path::new("clips/v1/a.usdz"), temp_dir.path()).await.unwrap();
        assert_eq!(path, temp_dir.path().join("clips/v1/a.usdz"));
        assert_eq!(std::fs::read(&path).unwrap(), b"zip");
        assert_eq!(hub.transfers(), 1);
    }

    #[tokio::test]
    async fn test_dataset_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hub = MockDatasetHub::default();
        let err = hub.download(Path::new("nope.usdz"), temp_dir.path()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    #[should_panic(expected = "invalid locator")]
    fn test_with_objects_panics_on_bad_locator() {
        MockObjectStore::with_objects([("no-key", b"bad".to_vec())]);
    }
}
