//! Feed sources: where raw feed bytes come from.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::model::RawFeed;
use crate::parse::parse_feed;

/// Default per-request timeout for HTTP fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("feedsift/", env!("CARGO_PKG_VERSION"));

/// Fetches and parses a feed from a URL or path.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<RawFeed, FetchError>;
}

/// Fetches `location` from `source`, failing with [`FetchError::Timeout`]
/// once `deadline` has elapsed.
pub async fn fetch_within(
    source: &dyn FeedSource,
    location: &str,
    deadline: Duration,
) -> Result<RawFeed, FetchError> {
    tokio::time::timeout(deadline, source.fetch(location))
        .await
        .map_err(|_| FetchError::Timeout {
            location: location.to_string(),
            timeout: deadline,
        })?
}

/// Returns true for `http://` and `https://` locations.
pub fn is_http_location(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetches feeds over HTTP(S).
#[derive(Clone)]
pub struct HttpFeedSource {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedSource {
    /// Creates a source whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, location: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                location: location.to_string(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Network {
                location: location.to_string(),
                message: error.to_string(),
            }
        }
    }
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl fmt::Debug for HttpFeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFeedSource")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, location: &str) -> Result<RawFeed, FetchError> {
        if !is_http_location(location) {
            return Err(FetchError::UnsupportedLocation {
                location: location.to_string(),
            });
        }

        let response = self
            .http_client
            .get(location)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(location, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(location, e))?;
        debug!(location, bytes = body.len(), "fetched feed");

        parse_feed(&body, location)
    }
}

/// Reads feeds from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFeedSource;

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch(&self, location: &str) -> Result<RawFeed, FetchError> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        let bytes = tokio::fs::read(Path::new(path))
            .await
            .map_err(|source| FetchError::Io {
                location: location.to_string(),
                source,
            })?;
        debug!(location, bytes = bytes.len(), "read feed file");

        parse_feed(&bytes, location)
    }
}

/// Fetches `http(s)://` locations over the network and reads anything else
/// as a local path.
#[derive(Debug, Clone, Default)]
pub struct LocalOrHttpSource {
    http: HttpFeedSource,
    file: FileFeedSource,
}

impl LocalOrHttpSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpFeedSource::new(timeout),
            file: FileFeedSource,
        }
    }
}

#[async_trait]
impl FeedSource for LocalOrHttpSource {
    async fn fetch(&self, location: &str) -> Result<RawFeed, FetchError> {
        if is_http_location(location) {
            self.http.fetch(location).await
        } else {
            self.file.fetch(location).await
        }
    }
}
