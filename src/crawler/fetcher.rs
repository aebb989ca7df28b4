//! Fetch client capability
//!
//! This module defines the one capability the harvest core needs from the
//! network: `fetch(url, timeout) -> (status, body) | transport error`.
//! It also provides:
//! - An HTTP implementation on top of `reqwest`
//! - Transport error classification
//! - Folding of non-success statuses and transport errors into one soft failure

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

const MAX_REDIRECTS: usize = 10;

/// A response as seen by the harvest core
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// Final URL after redirects
    pub final_url: String,

    /// Page body content
    pub body: String,
}

impl FetchResponse {
    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level errors (the request never produced a usable response)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Classifies a `reqwest` error raised while sending a request
    fn from_send(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            Self::Connect {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// The capability the discovery and harvest phases fetch pages through
///
/// Implementations own their retry and anti-blocking behavior; the core only
/// looks at the status code and the body. Implementations must be safe to
/// call from many workers at once.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetches one URL, giving up after `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client from the client configuration
///
/// # Arguments
///
/// * `config` - User agent and connection settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::ClientConfig;
/// use catalog_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&ClientConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `reqwest`-backed fetch client
///
/// `reqwest::Client` is a connection pool, so one instance is shared by all
/// workers without any additional locking.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a client built from `config`
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl FetchClient for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_send(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(FetchResponse {
            status,
            final_url,
            body,
        })
    }
}

/// Why a page could not be retrieved
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The server answered with a non-2xx status
    #[error("HTTP {0}")]
    Status(u16),

    /// No usable response at all
    #[error(transparent)]
    Transport(#[from] FetchError),
}

/// Fetches a page body, folding every way of not getting one into `FetchFailure`
///
/// Used by both the discovery and the harvest phase, which treat non-success
/// statuses and transport errors the same way.
pub async fn fetch_page(
    client: &dyn FetchClient,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchFailure> {
    let response = client.fetch(url, timeout).await?;

    if !response.is_success() {
        return Err(FetchFailure::Status(response.status));
    }

    Ok(response.body)
}
