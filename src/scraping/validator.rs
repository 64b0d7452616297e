//! Target URL validation
//!
//! Normalizes a user-supplied URL string and rejects anything that should
//! never reach the fetcher:
//! - missing or blank input
//! - unparseable URLs
//! - hosts on the private/local blocklist
//! - schemes other than `http` and `https`
//!
//! The blocklist is an exact-match / prefix check on the host string. It does
//! not resolve DNS, so a public name that resolves to a private address is not
//! caught here. Redirect hops are checked against the same blocklist by the
//! fetch engine (`FetchEngine::with_redirect_guard`).

use thiserror::Error;
use url::Url;

use crate::config::ValidationConfig;

/// Reasons a target URL is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlValidationError {
    #[error("URL parameter is required and must be a string")]
    Missing,
    #[error("URL cannot be empty")]
    Empty,
    #[error("Invalid URL format. Please provide a valid URL with protocol (http:// or https://)")]
    Malformed(String),
    #[error("Access to private/local networks is not allowed")]
    BlockedHost(String),
    #[error("Only HTTP and HTTPS protocols are supported")]
    UnsupportedScheme(String),
}

/// A URL that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    /// The trimmed input, with `https://` prepended when it had no scheme
    pub normalized: String,
    /// Parsed form of `normalized`
    pub parsed: Url,
}

/// URL validator with a configurable host blocklist
#[derive(Debug, Clone)]
pub struct UrlValidator {
    blocked_hosts: Vec<String>,
    blocked_prefixes: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl UrlValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            blocked_hosts: config
                .blocked_hosts
                .iter()
                .map(|h| h.trim().to_lowercase())
                .collect(),
            blocked_prefixes: config
                .blocked_prefixes
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Validate and normalize a target URL.
    pub fn validate(&self, input: Option<&str>) -> Result<ValidatedUrl, UrlValidationError> {
        let raw = input.ok_or(UrlValidationError::Missing)?;

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UrlValidationError::Empty);
        }

        let candidate = if trimmed.starts_with("http://")
            || trimmed.starts_with("https://")
            || has_explicit_scheme(trimmed)
        {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let parsed = match Url::parse(&candidate) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %trimmed, error = %e, "URL validation failed");
                return Err(UrlValidationError::Malformed(e.to_string()));
            }
        };

        let host = match Self::host_key(&parsed) {
            Some(host) => host,
            None => {
                // Non-special schemes such as `mailto:` parse without a host;
                // the scheme check is the more useful message for those.
                if !is_http_scheme(parsed.scheme()) {
                    return Err(UrlValidationError::UnsupportedScheme(
                        parsed.scheme().to_string(),
                    ));
                }
                return Err(UrlValidationError::Malformed("URL has no host".to_string()));
            }
        };

        if self.is_blocked(&host) {
            return Err(UrlValidationError::BlockedHost(host));
        }

        if !is_http_scheme(parsed.scheme()) {
            return Err(UrlValidationError::UnsupportedScheme(
                parsed.scheme().to_string(),
            ));
        }

        Ok(ValidatedUrl {
            normalized: candidate,
            parsed,
        })
    }

    /// Lower-cased host of `url` with IPv6 brackets removed
    pub fn host_key(url: &Url) -> Option<String> {
        url.host_str()
            .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_lowercase())
    }

    /// Check a lower-cased host against the blocklist
    pub fn is_blocked(&self, host: &str) -> bool {
        self.blocked_hosts.iter().any(|h| h == host)
            || self.blocked_prefixes.iter().any(|p| host.starts_with(p.as_str()))
    }
}

fn is_http_scheme(scheme: &str) -> bool {
    scheme == "http" || scheme == "https"
}

/// True for inputs of the form `scheme://...`, e.g. `ftp://host` or `HTTP://host`
fn has_explicit_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
