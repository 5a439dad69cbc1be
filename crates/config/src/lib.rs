//! Layered configuration for the scene manager.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. an optional configuration file (`.yaml`/`.yml`, `.toml` or `.json`),
//! 3. environment variables prefixed with `SCENESET_`, with nested keys
//!    separated by `__` (e.g. `SCENESET_SCENES__CACHE_DIR`).

pub mod error;
mod models;

use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::Path;

pub use crate::models::{
    CatalogSource, Config, DEFAULT_HUB_ENDPOINT, DEFAULT_HUB_REVISION, HubConfig, ObjectStoreConfig, ScenesConfig,
};

pub const ENV_PREFIX: &str = "SCENESET_";

impl Config {
    /// Load configuration from every source.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::layered(file)?.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Defaults overlaid with the configuration file, without the environment.
    pub fn layered(file: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let Some(path) = file else {
            return Ok(figment);
        };
        if !path.is_file() {
            exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
        }
        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
            Some("toml") => figment.merge(Toml::file_exact(path)),
            Some("json") => figment.merge(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|err| exn::Exn::from(ErrorKind::Extract(err.to_string())))?;
        config.scenes.catalog_source()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_yaml_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            temp_dir.path(),
            "sceneset.yaml",
            r#"
scenes:
  scenes_csv: /data/sim_scenes.csv
  suites_csv: /data/sim_suites.csv
  cache_dir: /mnt/cache
hub:
  repo_id: org/scenes
  token: secret
"#,
        );
        let config = Config::from_figment(Config::layered(Some(&path)).unwrap()).unwrap();
        assert_eq!(config.scenes.cache_dir, PathBuf::from("/mnt/cache"));
        assert_eq!(
            config.scenes.catalog_source().unwrap(),
            CatalogSource::Tables {
                scenes: PathBuf::from("/data/sim_scenes.csv"),
                suites: PathBuf::from("/data/sim_suites.csv"),
            }
        );
        let hub = config.hub.unwrap();
        assert_eq!(hub.endpoint, DEFAULT_HUB_ENDPOINT);
        assert_eq!(hub.revision, DEFAULT_HUB_REVISION);
        assert_eq!(hub.token.as_deref(), Some("secret"));
        assert_eq!(config.object_store, None);
    }

    #[test]
    fn test_toml_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            temp_dir.path(),
            "sceneset.toml",
            r#"
[scenes]
local_archive_dir = "/data/usdz"

[object_store]
region = "us-east-1"
endpoint = "https://pdx.s8k.io"
key_id = "id"
key_secret = "secret"
"#,
        );
        let config = Config::from_figment(Config::layered(Some(&path)).unwrap()).unwrap();
        assert_eq!(config.scenes.cache_root(), Path::new("/data/usdz"));
        let store = config.object_store.unwrap();
        assert_eq!(store.endpoint.as_deref(), Some("https://pdx.s8k.io"));
    }

    #[test]
    fn test_json_file_without_catalog_is_invalid() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), "sceneset.json", r#"{"scenes": {"cache_dir": "/mnt/cache"}}"#);
        let err = Config::from_figment(Config::layered(Some(&path)).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), "sceneset.yaml", "scenes: 42\n");
        let err = Config::from_figment(Config::layered(Some(&path)).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Extract(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "sceneset.yaml",
                "scenes:\n  local_archive_dir: /data/usdz\n  cache_dir: /from/file\nhub:\n  repo_id: org/scenes\n",
            )?;
            jail.set_env("SCENESET_SCENES__CACHE_DIR", "/from/env");
            jail.set_env("SCENESET_HUB__REVISION", "v2");
            let config = Config::load(Some(Path::new("sceneset.yaml"))).unwrap();
            assert_eq!(config.scenes.cache_dir, PathBuf::from("/from/env"));
            assert_eq!(config.scenes.local_archive_dir, Some(PathBuf::from("/data/usdz")));
            let hub = config.hub.unwrap();
            assert_eq!(hub.repo_id, "org/scenes");
            assert_eq!(hub.revision, "v2");
            assert_eq!(hub.endpoint, DEFAULT_HUB_ENDPOINT);
            Ok(())
        });
    }

    #[test]
    fn test_environment_alone() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SCENESET_SCENES__LOCAL_ARCHIVE_DIR", "/data/usdz");
            let config = Config::load(None).unwrap();
            assert_eq!(config.scenes.catalog_source().unwrap(), CatalogSource::Directory(PathBuf::from("/data/usdz")));
            assert_eq!(config.hub, None);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = Config::layered(Some(&temp_dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFile(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), "sceneset.ini", "[scenes]");
        let err = Config::layered(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_defaults_only_need_a_catalog() {
        let figment = Config::layered(None)
            .unwrap()
            .merge(Serialized::default("scenes.local_archive_dir", "/data/usdz"));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.scenes.catalog_source().unwrap(), CatalogSource::Directory(PathBuf::from("/data/usdz")));
        assert_ne!(config.scenes.cache_dir, PathBuf::new());
    }
}
