//! Making sure artifacts are present in the local store.
//!
//! Artifacts are grouped by repository and each group is fetched its own
//! way:
//!
//! - **local**: nothing to transfer. The archive must exist where the
//!   catalog says, and the store gets a symlink to it.
//! - **hosted dataset**: missing artifacts are downloaded at most
//!   [`MAX_HUB_DOWNLOADS`] at a time into a staging directory, checked
//!   against their manifest, then renamed into the store.
//! - **object store**: every artifact is requested at once; the client
//!   limits its own concurrency and skips artifacts already present.
//!
//! Every artifact in a batch runs to completion, even once one has failed.
//! Each failure is logged, and the first one is returned.

use crate::error::{ErrorKind, IntegrityError, Result};
use crate::layout::StoreLayout;
use exn::ResultExt;
use futures::{StreamExt, stream};
use sceneset_archive::read_manifest_uuid;
use sceneset_catalog::{ArtifactRepository, Catalog, Located};
use sceneset_storage::{DatasetHub, DatasetHubHandle, ObjectPath, ObjectStore, ObjectStoreHandle, Transfer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Upper bound on concurrent hosted-dataset downloads.
pub const MAX_HUB_DOWNLOADS: usize = 5;

/// Repository clients, constructed once and shared.
#[derive(Clone, Default)]
pub struct Backends {
    pub object_store: Option<ObjectStoreHandle>,
    pub hub: Option<DatasetHubHandle>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("object_store", &self.object_store.as_ref().map(|client| client.name()))
            .field("hub", &self.hub.as_ref().map(|client| client.name()))
            .finish()
    }
}

/// Wait for a whole batch, log every failure and return the first one.
pub(crate) fn first_failure<T>(results: impl IntoIterator<Item = Result<T>>) -> Result<Vec<T>> {
    let mut values = Vec::new();
    let mut first = None;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => {
                tracing::error!(error = ?err, "Artifact failed");
                first.get_or_insert(err);
            },
        }
    }
    match first {
        Some(err) => Err(err),
        None => Ok(values),
    }
}

fn missing_client(repository: ArtifactRepository, artifacts: &[&Located]) -> ErrorKind {
    let uuids: Vec<&str> = artifacts.iter().map(|artifact| artifact.uuid.as_str()).collect();
    ErrorKind::Configuration(format!("no {repository} client configured, but artifacts {uuids:?} need one"))
}

#[derive(Debug, Clone)]
pub struct Downloader {
    catalog: Catalog,
    layout: StoreLayout,
    backends: Backends,
}

impl Downloader {
    pub fn new(catalog: Catalog, layout: StoreLayout, backends: Backends) -> Self {
        Self { catalog, layout, backends }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Make sure every artifact is present in the store.
    ///
    /// Nothing is returned until every repository group has finished.
    #[instrument(skip_all, fields(artifacts = uuids.len()))]
    pub async fn ensure_local<S>(&self, uuids: &[S]) -> Result<()>
    where
        S: AsRef<str> + Serialize + Sync,
    {
        let located = self.catalog.locate(uuids).await.or_raise(|| ErrorKind::Catalog)?;
        let mut groups: BTreeMap<ArtifactRepository, Vec<&Located>> = BTreeMap::new();
        for artifact in located.values() {
            groups.entry(artifact.repository).or_default().push(artifact);
        }
        let group = |repository| groups.get(&repository).map(Vec::as_slice).unwrap_or_default();

        let (local, hub, object_store) = tokio::join!(
            self.link_local(group(ArtifactRepository::Local)),
            self.fetch_from_hub(group(ArtifactRepository::HostedDataset)),
            self.fetch_from_object_store(group(ArtifactRepository::ObjectStore)),
        );
        local.and(hub).and(object_store)
    }

    /// Verify local artifacts exist and expose them through the store.
    async fn link_local(&self, artifacts: &[&Located]) -> Result<()> {
        if artifacts.is_empty() {
            return Ok(());
        }
        tracing::info!(count = artifacts.len(), "Using local artifacts, no download needed");
        let mut results = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            results.push(self.link_local_one(artifact).await);
        }
        first_failure(results).map(drop)
    }

    async fn link_local_one(&self, artifact: &Located) -> Result<()> {
        let source = PathBuf::from(&artifact.locator);
        let not_found = || ErrorKind::LocalArtifactNotFound { uuid: artifact.uuid.clone(), path: source.clone() };
        if !tokio::fs::try_exists(&source).await.or_raise(not_found)? {
            exn::bail!(not_found());
        }
        let entry = self.layout.artifact_path(&artifact.uuid);
        if tokio::fs::symlink_metadata(&entry).await.is_ok() {
            return Ok(());
        }
        // Absolute, so the entry doesn't depend on where the store lives.
        let target = std::path::absolute(&source).or_raise(|| ErrorKind::Filesystem(source.clone()))?;
        match tokio::fs::symlink(&target, &entry).await {
            Ok(()) => Ok(()),
            // Another build got there first.
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(err).or_raise(|| ErrorKind::Filesystem(entry)),
        }
    }

    /// Download missing hosted-dataset artifacts through a bounded pool.
    async fn fetch_from_hub(&self, artifacts: &[&Located]) -> Result<()> {
        let mut missing = Vec::new();
        for artifact in artifacts {
            let destination = self.layout.artifact_path(&artifact.uuid);
            if !tokio::fs::try_exists(&destination).await.or_raise(|| ErrorKind::Filesystem(destination))? {
                missing.push(*artifact);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        let Some(hub) = &self.backends.hub else {
            exn::bail!(missing_client(ArtifactRepository::HostedDataset, &missing));
        };
        tracing::info!(count = missing.len(), client = hub.name(), "Downloading missing hosted-dataset artifacts");

        // Same filesystem as the store, so the final move is a rename.
        let scenesets_dir = self.layout.scenesets_dir();
        let staging = tempfile::Builder::new()
            .prefix(".download-")
            .tempdir_in(&scenesets_dir)
            .or_raise(|| ErrorKind::Filesystem(scenesets_dir))?;
        let workers = missing.len().min(MAX_HUB_DOWNLOADS);
        let downloads: Vec<_> = missing
            .into_iter()
            .map(|artifact| self.fetch_one_from_hub(hub.as_ref(), artifact, staging.path()))
            .collect();
        let results: Vec<Result<()>> = stream::iter(downloads).buffer_unordered(workers).collect().await;
        first_failure(results).map(drop)
    }

    async fn fetch_one_from_hub(
        &self,
        hub: &(dyn DatasetHub + Send + Sync),
        artifact: &Located,
        staging: &Path,
    ) -> Result<()> {
        let uuid = &artifact.uuid;
        tracing::info!(%uuid, locator = %artifact.locator, "Downloading hosted-dataset artifact");
        let downloaded = hub
            .download(Path::new(&artifact.locator), staging)
            .await
            .or_raise(|| ErrorKind::Transfer(uuid.clone()))?;

        let claimed = {
            let path = downloaded.clone();
            tokio::task::spawn_blocking(move || read_manifest_uuid(&path)).await.or_raise(|| ErrorKind::Task)?
        };
        let claimed = claimed.or_raise(|| {
            ErrorKind::Integrity(IntegrityError::UnreadableArtifact { uuid: uuid.clone(), path: downloaded.clone() })
        })?;
        if claimed != *uuid {
            exn::bail!(ErrorKind::Integrity(IntegrityError::IdentityMismatch {
                locator: artifact.locator.clone(),
                expected: uuid.clone(),
                actual: claimed,
            }));
        }

        let destination = self.layout.artifact_path(uuid);
        tokio::fs::rename(&downloaded, &destination)
            .await
            .or_raise(|| ErrorKind::Filesystem(destination.clone()))?;
        Ok(())
    }

    /// Request every object-store artifact at once.
    async fn fetch_from_object_store(&self, artifacts: &[&Located]) -> Result<()> {
        if artifacts.is_empty() {
            return Ok(());
        }
        let Some(store) = &self.backends.object_store else {
            exn::bail!(missing_client(ArtifactRepository::ObjectStore, artifacts));
        };
        tracing::info!(
            count = artifacts.len(),
            client = store.name(),
            "Downloading artifacts from the object store, existing files are skipped"
        );
        let results = futures::future::join_all(
            artifacts.iter().map(|artifact| self.fetch_one_from_object_store(store.as_ref(), artifact)),
        )
        .await;
        let transfers = first_failure(results)?;
        let downloaded = transfers.iter().filter(|transfer| matches!(transfer, Transfer::Downloaded(_))).count();
        tracing::info!(downloaded, skipped = transfers.len() - downloaded, "Object store artifacts ready");
        Ok(())
    }

    async fn fetch_one_from_object_store(
        &self,
        store: &(dyn ObjectStore + Send + Sync),
        artifact: &Located,
    ) -> Result<Transfer> {
        let transfer = || ErrorKind::Transfer(artifact.uuid.clone());
        let object = ObjectPath::parse(&artifact.locator).or_raise(transfer)?;
        store.download(&object, &self.layout.artifact_path(&artifact.uuid)).await.or_raise(transfer)
    }
}
