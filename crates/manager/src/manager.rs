use crate::download::{Backends, Downloader};
use crate::error::{ErrorKind, Result};
use crate::layout::StoreLayout;
use crate::sceneset::ScenesetBuilder;
use exn::ResultExt;
use sceneset_catalog::{Catalog, ResolvedPair};
use sceneset_config::{CatalogSource, Config, HubConfig, ObjectStoreConfig};
use sceneset_storage::client::{HubClient, S3Client};
use sceneset_storage::{DatasetHubHandle, ObjectStoreHandle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

/// A built sceneset and the scenes it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sceneset {
    pub path: PathBuf,
    /// One entry per scene, ordered by scene id.
    pub scenes: Vec<ResolvedPair>,
}

impl Sceneset {
    pub fn uuids(&self) -> Vec<&str> {
        self.scenes.iter().map(|pair| pair.uuid.as_str()).collect()
    }
}

fn object_store_client(config: &ObjectStoreConfig) -> ObjectStoreHandle {
    Arc::new(S3Client::new(
        "object-store",
        &config.region,
        config.endpoint.clone(),
        &config.key_id,
        &config.key_secret,
    ))
}

fn hub_client(config: &HubConfig) -> Result<DatasetHubHandle> {
    let client = HubClient::new("hosted-dataset", &config.repo_id)
        .or_raise(|| ErrorKind::Configuration("unable to create the hosted-dataset client".to_string()))?
        .with_endpoint(&config.endpoint)
        .with_revision(&config.revision)
        .with_token(config.token.clone());
    Ok(Arc::new(client))
}

/// Resolves scenes against the catalog and turns them into scenesets.
#[derive(Debug, Clone)]
pub struct SceneManager {
    catalog: Catalog,
    builder: ScenesetBuilder,
}

impl SceneManager {
    pub fn new(catalog: Catalog, layout: StoreLayout, backends: Backends) -> Self {
        let builder = ScenesetBuilder::new(Downloader::new(catalog.clone(), layout, backends));
        Self { catalog, builder }
    }

    /// Load the catalog, prepare the cache and construct the repository
    /// clients that are configured.
    #[instrument(skip_all)]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let source = config.scenes.catalog_source().map_err(|err| {
            let message = (*err).to_string();
            err.raise(ErrorKind::Configuration(message))
        })?;
        let root = config.scenes.cache_root();
        if !root.is_dir() {
            exn::bail!(ErrorKind::Configuration(format!("cache directory {} does not exist", root.display())));
        }

        let catalog = match source {
            CatalogSource::Tables { scenes, suites } => Catalog::load_from_csv(scenes, suites).await,
            CatalogSource::Directory(dir) => Catalog::load_from_directory(dir).await,
        }
        .map_err(ErrorKind::catalog)?;
        let counts = catalog.counts().await.map_err(ErrorKind::catalog)?;
        tracing::info!(scenes = counts.scenes, suites = counts.suites, "Loaded scene catalog");

        let layout = StoreLayout::new(root);
        layout.ensure_dirs()?;
        let backends = Backends {
            object_store: config.object_store.as_ref().map(object_store_client),
            hub: config.hub.as_ref().map(hub_client).transpose()?,
        };
        Ok(Self::new(catalog, layout, backends))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn layout(&self) -> &StoreLayout {
        self.builder.layout()
    }

    pub async fn query_by_ids<S, V>(&self, scene_ids: &[S], versions: &[V]) -> Result<Vec<ResolvedPair>>
    where
        S: AsRef<str> + Serialize,
        V: AsRef<str> + Serialize,
    {
        self.catalog.query_by_ids(scene_ids, versions).await.map_err(ErrorKind::catalog)
    }

    pub async fn query_by_suite<V>(&self, suite_id: impl AsRef<str>, versions: &[V]) -> Result<Vec<ResolvedPair>>
    where
        V: AsRef<str> + Serialize,
    {
        self.catalog.query_by_suite(suite_id, versions).await.map_err(ErrorKind::catalog)
    }

    /// Build (or reuse) the sceneset for these artifacts.
    pub async fn create_sceneset<S>(&self, uuids: &[S]) -> Result<PathBuf>
    where
        S: AsRef<str> + Serialize + Sync,
    {
        self.builder.build(uuids).await
    }

    /// Resolve scene ids and build their sceneset.
    pub async fn resolve_ids<S, V>(&self, scene_ids: &[S], versions: &[V]) -> Result<Sceneset>
    where
        S: AsRef<str> + Serialize,
        V: AsRef<str> + Serialize,
    {
        let scenes = self.query_by_ids(scene_ids, versions).await?;
        self.finish(scenes).await
    }

    /// Resolve every member of a suite and build their sceneset.
    pub async fn resolve_suite<V>(&self, suite_id: impl AsRef<str>, versions: &[V]) -> Result<Sceneset>
    where
        V: AsRef<str> + Serialize,
    {
        let scenes = self.query_by_suite(suite_id, versions).await?;
        self.finish(scenes).await
    }

    async fn finish(&self, scenes: Vec<ResolvedPair>) -> Result<Sceneset> {
        let uuids: Vec<&str> = scenes.iter().map(|pair| pair.uuid.as_str()).collect();
        let path = self.create_sceneset(&uuids).await?;
        Ok(Sceneset { path, scenes })
    }
}
