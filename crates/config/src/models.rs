use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use sceneset_storage::{DEFAULT_HUB_ENDPOINT, DEFAULT_HUB_REVISION};

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "sceneset")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".sceneset-cache"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scenes: ScenesConfig,
    /// Required only if any artifact lives in the object store.
    pub object_store: Option<ObjectStoreConfig>,
    /// Required only if any artifact lives in a hosted dataset.
    pub hub: Option<HubConfig>,
}

/// Where the catalog comes from, and where scenesets are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenesConfig {
    pub scenes_csv: Option<PathBuf>,
    pub suites_csv: Option<PathBuf>,
    /// Scan this directory for archives instead of reading the CSV tables.
    /// It then doubles as the cache root.
    pub local_archive_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
}
impl Default for ScenesConfig {
    fn default() -> Self {
        Self {
            scenes_csv: None,
            suites_csv: None,
            local_archive_dir: None,
            cache_dir: default_cache_dir(),
        }
    }
}

/// How the catalog should be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Tables { scenes: PathBuf, suites: PathBuf },
    Directory(PathBuf),
}

impl ScenesConfig {
    pub fn catalog_source(&self) -> Result<CatalogSource> {
        if let Some(dir) = &self.local_archive_dir {
            if self.scenes_csv.is_some() || self.suites_csv.is_some() {
                tracing::warn!(dir = %dir.display(), "Local archive directory set, ignoring catalog CSV tables");
            }
            return Ok(CatalogSource::Directory(dir.clone()));
        }
        match (&self.scenes_csv, &self.suites_csv) {
            (Some(scenes), Some(suites)) => Ok(CatalogSource::Tables { scenes: scenes.clone(), suites: suites.clone() }),
            (None, None) => exn::bail!(ErrorKind::Invalid(
                "either scenes.local_archive_dir or both scenes.scenes_csv and scenes.suites_csv must be set"
                    .to_string()
            )),
            _ => exn::bail!(ErrorKind::Invalid(
                "scenes.scenes_csv and scenes.suites_csv must be set together".to_string()
            )),
        }
    }

    /// Directory that holds the artifact store and the scenesets.
    pub fn cache_root(&self) -> &Path {
        self.local_archive_dir.as_deref().unwrap_or(&self.cache_dir)
    }
}

/// Credentials and endpoint for an S3-compatible object store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub key_id: String,
    pub key_secret: String,
}
impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

/// A dataset repository on a hosted hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    pub repo_id: String,
    #[serde(default = "HubConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "HubConfig::default_revision")]
    pub revision: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}
impl HubConfig {
    fn default_endpoint() -> String {
        DEFAULT_HUB_ENDPOINT.to_string()
    }

    fn default_revision() -> String {
        DEFAULT_HUB_REVISION.to_string()
    }
}
