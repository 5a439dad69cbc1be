//! Sceneset directories.
//!
//! A sceneset is a directory of symlinks, one per artifact, named by a digest
//! of the artifacts it holds. The same set of uuids always maps to the same
//! directory with the same contents, on any machine.

use crate::download::Downloader;
use crate::error::{ErrorKind, IntegrityError, Result};
use crate::layout::StoreLayout;
use crate::lock::ScenesetLock;
use exn::ResultExt;
use sceneset_archive::archive_file_name;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Digest naming the sceneset for this set of uuids.
///
/// BLAKE3 of the sorted, deduplicated uuids joined by commas; order and
/// repetition in the input don't matter.
pub fn sceneset_digest<S: AsRef<str>>(uuids: &[S]) -> String {
    let unique: BTreeSet<&str> = uuids.iter().map(AsRef::as_ref).collect();
    let joined = unique.into_iter().collect::<Vec<_>>().join(",");
    blake3::hash(joined.as_bytes()).to_hex().to_string()
}

/// Point `<dir>/<uuid>.usdz` at the store, or check that it already does.
fn link_artifact(dir: &Path, uuid: &str) -> Result<()> {
    let link = dir.join(archive_file_name(uuid));
    let expected = StoreLayout::link_target(uuid);
    let corrupt = |actual| {
        ErrorKind::Integrity(IntegrityError::CorruptSceneset { link: link.clone(), expected: expected.clone(), actual })
    };
    match fs::read_link(&link) {
        Ok(actual) if actual == expected => Ok(()),
        Ok(actual) => exn::bail!(corrupt(Some(actual))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::os::unix::fs::symlink(&expected, &link).or_raise(|| ErrorKind::Filesystem(link.clone()))
        },
        // Something is there, but it isn't a symlink.
        Err(_) if fs::symlink_metadata(&link).is_ok() => exn::bail!(corrupt(None)),
        Err(err) => Err(err).or_raise(|| ErrorKind::Filesystem(link.clone())),
    }
}

/// Create or validate the sceneset directory while holding its lock.
fn link_sceneset(layout: &StoreLayout, digest: &str, uuids: &BTreeSet<String>) -> Result<PathBuf> {
    let dir = layout.sceneset_dir(digest);
    let _lock = ScenesetLock::acquire(layout.lock_path(digest))?;
    fs::create_dir_all(&dir).or_raise(|| ErrorKind::Filesystem(dir.clone()))?;
    for uuid in uuids {
        link_artifact(&dir, uuid)?;
    }
    Ok(dir)
}

#[derive(Debug, Clone)]
pub struct ScenesetBuilder {
    downloader: Downloader,
}

impl ScenesetBuilder {
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }

    pub fn layout(&self) -> &StoreLayout {
        self.downloader.layout()
    }

    /// Fetch every artifact and materialize the sceneset directory holding
    /// them, returning its path.
    ///
    /// With no uuids there is nothing to build: the scenesets directory is
    /// returned as-is, without locking or creating anything.
    ///
    /// An existing entry pointing anywhere other than the store is reported
    /// as [`IntegrityError::CorruptSceneset`] and left alone.
    #[instrument(skip_all, fields(artifacts = uuids.len()))]
    pub async fn build<S>(&self, uuids: &[S]) -> Result<PathBuf>
    where
        S: AsRef<str> + Serialize + Sync,
    {
        if uuids.is_empty() {
            tracing::warn!("No artifacts requested, a sceneset directory is not created");
            return Ok(self.layout().scenesets_dir());
        }
        self.downloader.ensure_local(uuids).await?;

        let digest = sceneset_digest(uuids);
        let unique: BTreeSet<String> = uuids.iter().map(|uuid| uuid.as_ref().to_string()).collect();
        let layout = self.layout().clone();
        let dir = tokio::task::spawn_blocking(move || link_sceneset(&layout, &digest, &unique))
            .await
            .or_raise(|| ErrorKind::Task)??;
        tracing::info!(path = %dir.display(), "Created sceneset directory");
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::Backends;
    use crate::testing::{archive_bytes, catalog_with, scene};
    use sceneset_catalog::ArtifactRepository;
    use sceneset_storage::client::MockObjectStore;
    use std::sync::Arc;

    const UUIDS: [&str; 3] = ["uuid-c", "uuid-a", "uuid-b"];

    async fn setup(root: &Path) -> (ScenesetBuilder, Arc<MockObjectStore>) {
        let scenes = UUIDS
            .iter()
            .map(|uuid| scene(uuid, &format!("scene-{uuid}"), &format!("bucket/{uuid}.usdz"), ArtifactRepository::ObjectStore))
            .collect();
        let store = Arc::new(MockObjectStore::with_objects(
            UUIDS.iter().map(|uuid| (format!("bucket/{uuid}.usdz"), archive_bytes(uuid, &format!("scene-{uuid}")))),
        ));
        let layout = StoreLayout::new(root);
        layout.ensure_dirs().unwrap();
        let backends = Backends { object_store: Some(store.clone()), hub: None };
        let downloader = Downloader::new(catalog_with(scenes).await, layout, backends);
        (ScenesetBuilder::new(downloader), store)
    }

    fn assert_links(dir: &Path) {
        let mut entries: Vec<_> = fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().file_name()).collect();
        entries.sort();
        assert_eq!(entries, ["uuid-a.usdz", "uuid-b.usdz", "uuid-c.usdz"]);
        for uuid in UUIDS {
            let link = dir.join(archive_file_name(uuid));
            assert_eq!(fs::read_link(&link).unwrap(), StoreLayout::link_target(uuid));
            // Through the link, into the store.
            let manifest = sceneset_archive::read_manifest(&link).unwrap();
            assert_eq!(manifest.uuid, uuid);
        }
    }

    #[test]
    fn test_digest_ignores_order_and_duplicates() {
        let digest = sceneset_digest(&["b", "a"]);
        assert_eq!(digest, sceneset_digest(&["a", "b", "a"]));
        assert_eq!(digest, blake3::hash(b"a,b").to_hex().to_string());
        assert_ne!(digest, sceneset_digest(&["a"]));
        assert_eq!(digest.len(), 64);
    }

    #[tokio::test]
    async fn test_build_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (builder, store) = setup(temp_dir.path()).await;

        let first = builder.build(&UUIDS).await.unwrap();
        assert_eq!(first, builder.layout().sceneset_dir(&sceneset_digest(&UUIDS)));
        assert_eq!(store.transfers(), 3);
        assert_links(&first);

        let mut reordered = UUIDS;
        reordered.reverse();
        let second = builder.build(&reordered).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.transfers(), 3);
        assert_links(&second);
    }

    #[tokio::test]
    async fn test_fresh_builder_reuses_cache() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (builder, _) = setup(temp_dir.path()).await;
        let first = builder.build(&UUIDS).await.unwrap();

        // A new process: new catalog, new clients, same cache root.
        let (builder, store) = setup(temp_dir.path()).await;
        assert_eq!(builder.build(&UUIDS).await.unwrap(), first);
        assert_eq!(store.transfers(), 0);
    }

    #[tokio::test]
    async fn test_empty_build_touches_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (builder, store) = setup(temp_dir.path()).await;
        let none: [&str; 0] = [];

        let dir = builder.build(&none).await.unwrap();
        assert_eq!(dir, builder.layout().scenesets_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        assert_eq!(store.transfers(), 0);
    }

    #[tokio::test]
    async fn test_wrong_link_target_is_reported_not_repaired() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (builder, _) = setup(temp_dir.path()).await;
        let dir = builder.build(&UUIDS).await.unwrap();

        let link = dir.join("uuid-b.usdz");
        fs::remove_file(&link).unwrap();
        std::os::unix::fs::symlink("/somewhere/else.usdz", &link).unwrap();

        let err = builder.build(&UUIDS).await.unwrap_err();
        match &*err {
            ErrorKind::Integrity(IntegrityError::CorruptSceneset { link: reported, actual, .. }) => {
                assert_eq!(reported, &link);
                assert_eq!(actual.as_deref(), Some(Path::new("/somewhere/else.usdz")));
            },
            other => panic!("expected a corrupt sceneset, got {other:?}"),
        }
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("/somewhere/else.usdz"));
    }

    #[tokio::test]
    async fn test_regular_file_in_sceneset_is_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (builder, _) = setup(temp_dir.path()).await;
        let dir = builder.build(&UUIDS).await.unwrap();

        let link = dir.join("uuid-a.usdz");
        fs::remove_file(&link).unwrap();
        fs::write(&link, b"copied, not linked").unwrap();

        let err = builder.build(&UUIDS).await.unwrap_err();
        assert!(matches!(
            &*err,
            ErrorKind::Integrity(IntegrityError::CorruptSceneset { actual: None, .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_builds_agree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (builder, _) = setup(temp_dir.path()).await;
        let builder = Arc::new(builder);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let builder = Arc::clone(&builder);
                tokio::spawn(async move { builder.build(&UUIDS).await })
            })
            .collect();
        let mut dirs = BTreeSet::new();
        for task in tasks {
            dirs.insert(task.await.unwrap().unwrap());
        }
        assert_eq!(dirs.len(), 1);
        assert_links(dirs.first().unwrap());
    }

    #[tokio::test]
    async fn test_cache_survives_remount() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (mount_a, mount_b) = (temp_dir.path().join("mount-a"), temp_dir.path().join("mount-b"));
        fs::create_dir(&mount_a).unwrap();
        let (builder_a, _) = setup(&mount_a).await;
        let built_a = builder_a.build(&UUIDS).await.unwrap();

        fs::rename(&mount_a, &mount_b).unwrap();
        let (builder_b, store) = setup(&mount_b).await;
        let built_b = builder_b.build(&UUIDS).await.unwrap();

        assert_eq!(built_b, mount_b.join(built_a.strip_prefix(&mount_a).unwrap()));
        assert_eq!(store.transfers(), 0);
        assert_links(&built_b);
    }
}
