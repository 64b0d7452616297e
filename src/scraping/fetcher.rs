//! Fetch engine for target pages
//!
//! Single-page HTTP fetching with a bounded retry policy:
//! - Redirects are followed up to a configured limit
//! - Each attempt has a hard timeout
//! - Transient failures (timeouts, connect errors, 408/429/5xx-style statuses)
//!   are retried with exponential backoff
//!
//! DNS, connection, timeout and HTTP status failures are separate
//! `FetchError` variants.
//!
//! Bodies are read chunk by chunk and abandoned as soon as they pass
//! `max_content_size`. When built with a `UrlValidator`, redirects into
//! blocked hosts are refused.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use super::validator::UrlValidator;
use crate::config::ScrapingConfig;

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Statuses worth another attempt
const RETRYABLE_STATUSES: &[u16] = &[408, 413, 429, 500, 502, 503, 504, 521, 522, 524];

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("DNS lookup failed for {host}: {message}")]
    HostNotFound { host: String, message: String },
    #[error("Connection refused by {host}")]
    ConnectionRefused { host: String },
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Remote server responded with HTTP {status}")]
    Status { status: u16, url: Url },
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Redirect to blocked host {0}")]
    BlockedRedirect(String),
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Map a transport-level reqwest error onto the fetch taxonomy
    pub(crate) fn from_transport(err: reqwest::Error, url: &Url, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout);
        }
        if err.is_redirect() {
            return match find_source::<BlockedRedirect>(&err) {
                Some(blocked) => Self::BlockedRedirect(blocked.0.clone()),
                None => Self::TooManyRedirects,
            };
        }
        if err.is_connect() {
            return Self::from_connect(&err, url.host_str().unwrap_or_default(), timeout);
        }
        Self::Http(err)
    }

    fn from_connect(err: &reqwest::Error, host: &str, timeout: Duration) -> Self {
        let mut source: Option<&(dyn StdError + 'static)> = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => {
                        return Self::ConnectionRefused {
                            host: host.to_string(),
                        }
                    }
                    std::io::ErrorKind::TimedOut => return Self::Timeout(timeout),
                    _ => {}
                }
            }
            let text = cause.to_string();
            if text.contains("dns error") || text.contains("failed to lookup address") {
                return Self::HostNotFound {
                    host: host.to_string(),
                    message: error_chain(err),
                };
            }
            source = cause.source();
        }
        Self::Connect(error_chain(err))
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HostNotFound { .. }
            | Self::ConnectionRefused { .. }
            | Self::Connect(_)
            | Self::Timeout(_) => true,
            Self::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// HTTP status returned by the remote server, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Raised by the redirect policy for a hop into a blocked host
#[derive(Debug, Error)]
#[error("redirect to blocked host {0}")]
struct BlockedRedirect(String);

/// Raised by the redirect policy once the hop limit is exceeded
#[derive(Debug, Error)]
#[error("too many redirects")]
struct RedirectLimit;

/// First error of type `T` in the source chain of `err`
fn find_source<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(found) = cause.downcast_ref::<T>() {
            return Some(found);
        }
        source = cause.source();
    }
    None
}

/// Render an error and all of its sources on one line
fn error_chain(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The fetched URL (may differ from request due to redirects)
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content type header, if sent
    pub content_type: Option<String>,
    /// Decoded response body
    pub body: String,
    /// Time taken by the successful attempt
    pub fetch_duration: Duration,
    /// Number of attempts made, including the successful one
    pub attempts: u32,
}

/// Capability to fetch a single page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, following redirects, and return the final page
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Configuration for the fetch engine
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout per attempt
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Retries after the first attempt
    pub retry_limit: u32,
    /// Delay before the first retry
    pub retry_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&ScrapingConfig::default())
    }
}

impl From<&ScrapingConfig> for FetchConfig {
    fn from(config: &ScrapingConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            max_content_size: config.max_content_size,
            max_redirects: config.max_redirects,
            retry_limit: config.retry_limit,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// HTTP fetch engine
pub struct FetchEngine {
    http_client: reqwest::Client,
    config: FetchConfig,
}

impl FetchEngine {
    /// Create a new fetch engine that follows any redirect up to the limit
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        Self::build(config, None)
    }

    /// Create a fetch engine that refuses redirects into hosts `guard` blocks
    pub fn with_redirect_guard(config: FetchConfig, guard: UrlValidator) -> Result<Self, FetchError> {
        Self::build(config, Some(guard))
    }

    fn build(config: FetchConfig, guard: Option<UrlValidator>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(redirect_policy(config.max_redirects, guard))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Perform a single HTTP attempt
    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let transport = |e: reqwest::Error| FetchError::from_transport(e, url, self.config.timeout);

        let mut response = self
            .http_client
            .get(url.as_str())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        if let Some(ct) = &content_type {
            if !is_textual_content_type(ct) {
                return Err(FetchError::InvalidContentType(ct.clone()));
            }
        }

        let limit = self.config.max_content_size;
        if let Some(len) = response.content_length() {
            if len as usize > limit {
                return Err(FetchError::ContentTooLarge(len as usize));
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::ContentTooLarge(bytes.len() + chunk.len()));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = decode_body(&bytes, content_type.as_deref());

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
            fetch_duration: start.elapsed(),
            attempts: 1,
        })
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.config
            .retry_backoff
            .saturating_mul(factor)
            .min(MAX_BACKOFF)
    }
}

#[async_trait]
impl PageFetcher for FetchEngine {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(mut page) => {
                    page.attempts = attempt;
                    tracing::debug!(
                        url = %url,
                        final_url = %page.final_url,
                        attempts = attempt,
                        "Fetched page"
                    );
                    return Ok(page);
                }
                Err(e) if e.is_retryable() && attempt <= self.config.retry_limit => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::debug!(url = %url, attempts = attempt, error = %e, "Fetch failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Redirect policy: hop limit plus an optional host blocklist
fn redirect_policy(max_redirects: usize, guard: Option<UrlValidator>) -> reqwest::redirect::Policy {
    let Some(guard) = guard else {
        return reqwest::redirect::Policy::limited(max_redirects);
    };

    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            return attempt.error(RedirectLimit);
        }
        match UrlValidator::host_key(attempt.url()) {
            Some(host) if guard.is_blocked(&host) => attempt.error(BlockedRedirect(host)),
            _ => attempt.follow(),
        }
    })
}

/// Decode a body using the charset named in `content_type`, UTF-8 otherwise
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Content types the extractor can make sense of
fn is_textual_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/html")
        || ct.contains("application/xhtml")
        || ct.contains("xml")
        || ct.contains("text/plain")
}
