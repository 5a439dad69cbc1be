//! Turns scene requests into scenesets on local disk.
//!
//! A request (scene ids, or a suite id, plus the compatible versions) is
//! resolved against the catalog to one artifact per scene. Every artifact is
//! then made present in a shared store under the cache root, fetched from
//! whichever repository holds it, and finally linked into a sceneset
//! directory named by a digest of the artifact set.
//!
//! Several processes may share one cache root. Building a given sceneset is
//! guarded by an exclusive file lock next to it, and artifacts only appear in
//! the store once completely written.
//!
//! ```no_run
//! # async fn run(config: &sceneset_config::Config) -> sceneset_manager::Result<()> {
//! use sceneset_manager::SceneManager;
//!
//! let manager = SceneManager::from_config(config).await?;
//! let sceneset = manager.resolve_suite("nightly", &["25.1"]).await?;
//! println!("{} scenes in {}", sceneset.scenes.len(), sceneset.path.display());
//! # Ok(())
//! # }
//! ```

mod download;
pub mod error;
mod layout;
mod lock;
mod manager;
mod sceneset;
#[cfg(test)]
mod testing;

pub use crate::download::{Backends, Downloader, MAX_HUB_DOWNLOADS};
pub use crate::error::{Error, ErrorKind, IntegrityError, Result};
pub use crate::layout::{ARTIFACTS_DIR_NAME, SCENESETS_DIR_NAME, StoreLayout};
pub use crate::lock::ScenesetLock;
pub use crate::manager::{SceneManager, Sceneset};
pub use crate::sceneset::{ScenesetBuilder, sceneset_digest};
