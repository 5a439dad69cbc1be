//! Repository clients for scene artifacts.
//!
//! Artifacts are stored in one of several heterogeneous repositories. This
//! crate defines what the scene manager needs from each of them, and ships
//! implementations behind feature flags:
//!
//! - `s3`: [`S3Client`](client::S3Client) for S3-compatible object storage
//! - `hub`: [`HubClient`](client::HubClient) for hosted datasets
//! - `mock`: in-memory clients for tests in other crates
//!
//! The local filesystem repository needs no client at all.

pub mod client;
pub mod error;
mod locator;
mod path;
mod staging;

pub use crate::client::{DEFAULT_HUB_ENDPOINT, DEFAULT_HUB_REVISION, DatasetHub, ObjectStore, Transfer};
pub use crate::locator::ObjectPath;
pub use crate::path::{validate as validate_path, validate_key};
pub use crate::staging::StagedFile;
use std::sync::Arc;

/// Shared handle to an object store client, constructed once and injected.
pub type ObjectStoreHandle = Arc<dyn ObjectStore + Send + Sync>;
/// Shared handle to a hosted dataset client, constructed once and injected.
pub type DatasetHubHandle = Arc<dyn DatasetHub + Send + Sync>;
