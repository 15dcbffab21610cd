#![forbid(unsafe_code)]

//! Remote asset fetching.
//!
//! Remote images in markdown and remote Vega specs are downloaded
//! synchronously. Every caller treats a [`FetchError`] as "no content" and
//! degrades; nothing here aborts a render.
//!
//! [`Fetch`] is the seam: [`HttpFetcher`] does real requests with an
//! explicit timeout, tests substitute canned responses.

use std::io::Read;
use std::time::Duration;

/// Per-request timeout, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bodies larger than this are rejected.
pub const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("reading the body of {url} failed: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

/// Something that can turn a URL into bytes.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch, logging and swallowing failures.
    fn fetch_or_empty(&self, url: &str) -> Vec<u8> {
        self.fetch(url).unwrap_or_else(|error| {
            tracing::debug!(url, %error, "fetch failed; using empty content");
            Vec::new()
        })
    }
}

/// `http://` or `https://` prefix.
#[must_use]
pub fn is_url(target: &str) -> bool {
    target.starts_with("https://") || target.starts_with("http://")
}

/// Blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url, "fetching remote asset");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source: Box::new(source),
            })?;
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|source| FetchError::Read {
                url: url.to_string(),
                source,
            })?;
        if body.len() as u64 > MAX_BODY_BYTES {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: MAX_BODY_BYTES,
            });
        }
        Ok(body)
    }
}

/// A fetcher that never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl Fetch for OfflineFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Read {
            url: url.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Unsupported, "network disabled"),
        })
    }
}
