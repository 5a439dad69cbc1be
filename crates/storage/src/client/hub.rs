//! Hosted dataset client (Hugging Face Hub compatible).
//!
//! Files are fetched from the `resolve` endpoint of a dataset repository:
//! `{endpoint}/datasets/{repo_id}/resolve/{revision}/{filename}`.

use crate::{
    StagedFile,
    client::{DEFAULT_HUB_ENDPOINT, DEFAULT_HUB_REVISION, DatasetHub},
    error::{ErrorKind, Result},
    validate_path,
};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};

/// Hosted dataset client.
///
/// # Examples
///
/// ```no_run
/// use sceneset_storage::client::HubClient;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HubClient::new("hub", "nvidia/sim-scenes")?
///     .with_token(std::env::var("HF_TOKEN").ok());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubClient {
    name: String,
    http: reqwest::Client,
    endpoint: String,
    repo_id: String,
    revision: String,
    token: Option<String>,
}

impl HubClient {
    pub fn new(name: impl Into<String>, repo_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sceneset/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::BackendError("unable to build HTTP client".to_string()))?;
        Ok(Self {
            name: name.into(),
            http,
            endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            repo_id: repo_id.into(),
            revision: DEFAULT_HUB_REVISION.to_string(),
            token: None,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn file_url(&self, filename: &Path) -> Result<String> {
        let Some(filename) = filename.to_str() else {
            exn::bail!(ErrorKind::InvalidPath(filename.to_path_buf()));
        };
        Ok(format!(
            "{}/datasets/{}/resolve/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.repo_id,
            self.revision,
            filename
        ))
    }
}

#[async_trait]
impl DatasetHub for HubClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self, filename: &Path, local_dir: &Path) -> Result<PathBuf> {
        let filename = validate_path(filename)?;
        let url = self.file_url(&filename)?;
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request.send().await.or_raise(|| ErrorKind::Network(url.clone()))?;
        match response.status() {
            StatusCode::NOT_FOUND => exn::bail!(ErrorKind::NotFound(url)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => exn::bail!(ErrorKind::PermissionDenied(filename)),
            status if !status.is_success() => exn::bail!(ErrorKind::Network(format!("{url} returned {status}"))),
            _ => {},
        }
        let mut staged = StagedFile::create(local_dir.join(&filename)).await?;
        while let Some(chunk) = response.chunk().await.or_raise(|| ErrorKind::Network(url.clone()))? {
            staged.write(&chunk).await?;
        }
        let destination = staged.destination().to_path_buf();
        let written = staged.commit().await?;
        tracing::debug!(client = self.name(), repo = %self.repo_id, %url, bytes = written, "Downloaded dataset file");
        Ok(destination)
    }
}
