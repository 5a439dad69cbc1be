//! Repository client contracts and implementations.
//!
//! The scene manager never talks to a repository directly; it goes through
//! one of the two traits in this module. Each trait is the *whole* contract
//! the manager relies on, which keeps the manager testable with the
//! in-memory clients behind the `mock` feature.
//!
//! Both contracts leave retries, back-off, timeouts and rate limiting to the
//! implementation.

#[cfg(feature = "hub")]
mod hub;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "hub")]
pub use self::hub::HubClient;
#[cfg(feature = "mock")]
pub use self::mock::{MockDatasetHub, MockObjectStore};
#[cfg(feature = "s3")]
pub use self::s3::S3Client;
use crate::locator::ObjectPath;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Public Hugging Face Hub, used when no endpoint is configured.
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_HUB_REVISION: &str = "main";

/// Outcome of an object-store download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Bytes were fetched and placed at the destination.
    Downloaded(u64),
    /// The destination already existed; nothing was fetched.
    Skipped,
}

/// Object storage (S3-compatible).
///
/// # Contract
/// - If `destination` already exists, return [`Transfer::Skipped`] without
///   contacting the remote. Callers rely on this for idempotence and do not
///   check themselves.
/// - Otherwise the object must only appear at `destination` once it has
///   been completely written (see [`StagedFile`](crate::StagedFile)).
/// - Implementations must limit their own concurrency; callers fan out
///   without bound.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the configured client (used for logging only).
    fn name(&self) -> &str;

    async fn download(&self, object: &ObjectPath, destination: &Path) -> Result<Transfer>;
}

/// A hosted dataset repository (Hugging Face style).
///
/// # Contract
/// - Download `filename` (relative to the dataset root) into `local_dir`,
///   preserving its relative path, and return the absolute path of the
///   downloaded file.
/// - No existence check is expected: callers only ask for files they don't
///   have.
#[async_trait]
pub trait DatasetHub: Send + Sync {
    /// Name of the configured client (used for logging only).
    fn name(&self) -> &str;

    async fn download(&self, filename: &Path, local_dir: &Path) -> Result<PathBuf>;
}
