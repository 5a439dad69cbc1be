//! On-disk layout of the scene cache.
//!
//! ```text
//! <root>/
//! ├── artifacts/
//! │   └── <uuid>.usdz                  shared, append-only
//! └── scenesets/
//!     ├── <digest>.lock                guards <digest>/
//!     └── <digest>/
//!         └── <uuid>.usdz -> ../../artifacts/<uuid>.usdz
//! ```
//!
//! Sceneset entries are relative symlinks at a fixed depth, so the whole tree
//! stays valid when it is mounted somewhere else.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sceneset_archive::archive_file_name;
use std::path::{Path, PathBuf};

pub const ARTIFACTS_DIR_NAME: &str = "artifacts";
pub const SCENESETS_DIR_NAME: &str = "scenesets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(ARTIFACTS_DIR_NAME)
    }

    pub fn scenesets_dir(&self) -> PathBuf {
        self.root.join(SCENESETS_DIR_NAME)
    }

    /// Where the artifact with this uuid lives (or will live) in the store.
    pub fn artifact_path(&self, uuid: &str) -> PathBuf {
        self.artifacts_dir().join(archive_file_name(uuid))
    }

    pub fn sceneset_dir(&self, digest: &str) -> PathBuf {
        self.scenesets_dir().join(digest)
    }

    pub fn lock_path(&self, digest: &str) -> PathBuf {
        self.scenesets_dir().join(format!("{digest}.lock"))
    }

    /// Target of a sceneset entry, relative to the sceneset directory.
    pub fn link_target(uuid: &str) -> PathBuf {
        Path::new("..").join("..").join(ARTIFACTS_DIR_NAME).join(archive_file_name(uuid))
    }

    /// Create the store and sceneset directories if they don't exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.scenesets_dir(), self.artifacts_dir()] {
            if !dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "Cache directory doesn't exist, creating it");
                std::fs::create_dir_all(&dir).or_raise(|| ErrorKind::Filesystem(dir.clone()))?;
            }
        }
        Ok(())
    }
}
