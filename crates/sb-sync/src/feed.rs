//! Remote diff feed
//!
//! The updater only needs "give me the diff since version N"; `DiffFeed` is
//! that seam. `HttpFeed` is the production implementation over HTTP.

use std::time::Duration;

use log::debug;
use reqwest::Url;

use sb_core::ListType;

/// Default bound on a single diff download.
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Default Safe Browsing v1 update endpoint.
pub const DEFAULT_FEED_URL: &str = "http://sb.google.com/safebrowsing/update";

/// Error type for fetching a diff.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Feed returned HTTP status {0}")]
    Status(u16),
    #[error("Feed did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to start tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Parameters of one diff request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub list: ListType,
    pub major: u32,
    /// Last applied version, or `NEVER_SYNCED`
    pub local_version: i64,
}

impl DiffRequest {
    /// `version` query value: `<list>:<major>:<local>`.
    pub fn version_param(&self) -> String {
        format!("{}:{}:{}", self.list.remote_name(), self.major, self.local_version)
    }
}

/// Source of diff bodies. An empty body means "already current".
pub trait DiffFeed {
    fn fetch(&self, request: &DiffRequest) -> Result<String, FeedError>;
}

/// Feed endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl FeedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_FEED_TIMEOUT,
        }
    }
}

/// Blocking HTTP feed. Drives an async client on a private runtime so the
/// updater stays a plain sequential pipeline.
pub struct HttpFeed {
    config: FeedConfig,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpFeed {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(FeedError::Runtime)?;

        Ok(Self {
            config,
            client,
            runtime,
        })
    }

    /// Full request URL for a diff request.
    pub fn request_url(&self, request: &DiffRequest) -> Result<Url, FeedError> {
        Url::parse_with_params(
            &self.config.base_url,
            &[
                ("client", "api"),
                ("apikey", self.config.api_key.as_str()),
                ("version", request.version_param().as_str()),
            ],
        )
        .map_err(|e| FeedError::InvalidUrl(format!("{}: {}", self.config.base_url, e)))
    }

    async fn fetch_async(&self, url: Url) -> Result<String, FeedError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl DiffFeed for HttpFeed {
    fn fetch(&self, request: &DiffRequest) -> Result<String, FeedError> {
        let url = self.request_url(request)?;
        debug!("[{}] fetching diff since version {}", request.list, request.local_version);

        let timeout = self.config.timeout;
        self.runtime.block_on(async {
            tokio::time::timeout(timeout, self.fetch_async(url))
                .await
                .map_err(|_| FeedError::Timeout(timeout))?
        })
    }
}
