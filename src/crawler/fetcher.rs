//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests to fetch page content
//! - Error classification into transient and permanent failures
//!
//! Retrying is not done here: the fetch-process unit decides whether a
//! transient failure is attempted again.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Page body
    pub body: String,
}

/// Why a fetch failed
///
/// | Condition | Class |
/// |-----------|-------|
/// | Timeout | Transient |
/// | Connection refused / reset | Transient |
/// | HTTP 5xx | Transient |
/// | HTTP 429 | Transient |
/// | Other HTTP 4xx | Permanent |
/// | DNS failure | Permanent |
/// | Malformed URL | Permanent |
/// | Non-HTML content | Permanent |
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transient failure fetching {url}: {reason}")]
    Transient {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    #[error("permanent failure fetching {url}: {reason}")]
    Permanent {
        url: String,
        reason: String,
        status: Option<u16>,
    },
}

impl FetchError {
    pub fn transient(url: &Url, reason: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transient {
            url: url.to_string(),
            reason: reason.into(),
            status,
        }
    }

    pub fn permanent(url: &Url, reason: impl Into<String>, status: Option<u16>) -> Self {
        Self::Permanent {
            url: url.to_string(),
            reason: reason.into(),
            status,
        }
    }

    /// Returns true if the request may succeed when attempted again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Transient { reason, .. } | Self::Permanent { reason, .. } => reason,
        }
    }
}

/// The HTTP transport consumed by the crawler
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches one URL and returns its HTML body
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use deal_crawler::config::UserAgentConfig;
/// use deal_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status();
        if let Some(error) = classify_status(url, status) {
            return Err(error);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        if let Some(ct) = &content_type {
            if !is_html(ct) {
                return Err(FetchError::permanent(
                    url,
                    format!("Expected HTML, got {}", ct),
                    Some(status.as_u16()),
                ));
            }
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml")
}

/// Classifies an HTTP status; `None` means the response is usable
pub fn classify_status(url: &Url, status: StatusCode) -> Option<FetchError> {
    let code = Some(status.as_u16());

    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(FetchError::transient(url, format!("HTTP {}", status.as_u16()), code))
    } else {
        Some(FetchError::permanent(url, format!("HTTP {}", status.as_u16()), code))
    }
}

/// Classifies a transport-level error
pub fn classify_request_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::transient(url, "Request timeout", None);
    }

    if error.is_builder() || error.is_redirect() {
        return FetchError::permanent(url, error.to_string(), None);
    }

    if is_dns_failure(error) {
        return FetchError::permanent(url, "DNS resolution failed", None);
    }

    if error.is_connect() {
        return FetchError::transient(url, "Connection failed", None);
    }

    if error.is_request() || error.is_body() {
        return FetchError::transient(url, error.to_string(), None);
    }

    FetchError::permanent(url, error.to_string(), None)
}

/// Walks the source chain looking for a resolver failure
fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        let message = cause.to_string().to_ascii_lowercase();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        source = cause.source();
    }
    false
}
