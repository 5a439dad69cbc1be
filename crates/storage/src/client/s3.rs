//! S3-compatible object store client.
//!
//! Artifacts live in SwiftStack behind its S3 API, but nothing here is
//! specific to it: any S3-compatible service works.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file (or the
//! environment overlay of it). The bucket is not part of the client: every
//! catalog locator names its own bucket.

use crate::{
    ObjectPath, StagedFile,
    client::{ObjectStore, Transfer},
    error::{ErrorKind, Result},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
};
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
///
/// Callers fan out one task per artifact without any bound, so this is the
/// only thing standing between a large sceneset and the object store.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible object store client.
///
/// # Examples
///
/// ```no_run
/// use sceneset_storage::client::S3Client;
///
/// let client = S3Client::new(
///     "swiftstack",
///     "us-east-1",
///     Some("https://pdx.s8k.io"),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Client {
    name: String,
    client: Client,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Client {
    /// Create a new S3 client.
    ///
    /// # Arguments
    /// * `name` - A name for this client (used in logging)
    /// * `region` - AWS region or provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(key_id, key_secret, None, None, "sceneset-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (SwiftStack, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        }
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self, object: &ObjectPath, destination: &Path) -> Result<Transfer> {
        if fs::try_exists(destination).await.map_err(|e| ErrorKind::from_io(e, destination))? {
            tracing::debug!(client = self.name(), %object, "Destination already exists; skipping download");
            return Ok(Transfer::Skipped);
        }
        // Hold the permit for the whole transfer, not just the request.
        let _permit = self.acquire_permit().await?;
        let output = match self.client.get_object().bucket(&object.bucket).key(&object.key).send().await {
            Ok(output) => output,
            Err(err) => {
                let kind = match err.as_service_error() {
                    Some(service) if service.is_no_such_key() => ErrorKind::NotFound(object.to_string()),
                    _ => ErrorKind::Network(format!("failed to fetch {object}")),
                };
                return Err(exn::Exn::from(err).raise(kind));
            },
        };
        let mut body = output.body;
        let mut staged = StagedFile::create(destination).await?;
        while let Some(chunk) = body
            .try_next()
            .await
            .or_raise(|| ErrorKind::Network(format!("interrupted while streaming {object}")))?
        {
            staged.write(&chunk).await?;
        }
        let written = staged.commit().await?;
        tracing::debug!(client = self.name(), %object, bytes = written, "Downloaded object");
        Ok(Transfer::Downloaded(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_existing_destination_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("a.usdz");
        std::fs::write(&destination, b"already here").unwrap();
        // The endpoint is never contacted: the skip happens before any request.
        let client = S3Client::new("test", "us-east-1", Some("http://127.0.0.1:9"), "id", "secret");
        let transfer = client.download(&ObjectPath::new("bucket", "a.usdz"), &destination).await.unwrap();
        assert_eq!(transfer, Transfer::Skipped);
        assert_eq!(std::fs::read(&destination).unwrap(), b"already here");
    }
}
