//! Outbound fetch and URL validation configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Outbound fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Per-attempt request timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connection establishment timeout (milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum redirects to follow
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Retries after the first attempt for retryable failures
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Base delay before the first retry (milliseconds), doubled per retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Maximum response body size (bytes)
    #[serde(default = "default_max_content_size")]
    pub max_content_size: usize,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_redirects() -> usize {
    5
}

fn default_retry_limit() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_max_content_size() -> usize {
    5 * 1024 * 1024
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            retry_limit: default_retry_limit(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_content_size: default_max_content_size(),
        }
    }
}

/// Host blocklist applied before any network access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Hostnames rejected on exact (case-insensitive) match
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,
    /// Hostname prefixes rejected on match
    #[serde(default = "default_blocked_prefixes")]
    pub blocked_prefixes: Vec<String>,
}

fn default_blocked_hosts() -> Vec<String> {
    ["localhost", "127.0.0.1", "0.0.0.0", "::1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_blocked_prefixes() -> Vec<String> {
    ["192.168.", "10.", "172."]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            blocked_hosts: default_blocked_hosts(),
            blocked_prefixes: default_blocked_prefixes(),
        }
    }
}
