//! Configuration for the metadata scraper service

mod logging;
mod scraping;
mod server;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scraping::{ScrapingConfig, ValidationConfig};
pub use server::{Environment, RateLimitConfig, ServerConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Default user agent for outbound page fetches
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MetaScraper/1.0)";

/// Upper bound on fetch retries
const MAX_RETRY_LIMIT: u32 = 10;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Outbound fetch configuration
    #[serde(default)]
    pub scraping: ScrapingConfig,
    /// URL blocklist configuration
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults, then apply
    /// environment overrides and validate the result.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognized keys: `PORT`, `NODE_ENV`, `APP_ENV`, `REQUEST_TIMEOUT`,
    /// `USER_AGENT`, `MAX_REDIRECTS`, `RATE_LIMIT_WINDOW`, `RATE_LIMIT_MAX`,
    /// `CORS_ORIGIN`, `LOG_FORMAT`, `LOG_LEVEL`. Values that fail to parse are
    /// skipped with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PORT") {
            set_parsed(&mut self.server.port, "PORT", &v);
        }
        if let Some(v) = get("APP_ENV").or_else(|| get("NODE_ENV")) {
            set_parsed(&mut self.server.environment, "NODE_ENV", &v);
        }
        if let Some(v) = get("REQUEST_TIMEOUT") {
            set_parsed(&mut self.scraping.timeout_ms, "REQUEST_TIMEOUT", &v);
        }
        if let Some(v) = get("USER_AGENT") {
            self.scraping.user_agent = v;
        }
        if let Some(v) = get("MAX_REDIRECTS") {
            set_parsed(&mut self.scraping.max_redirects, "MAX_REDIRECTS", &v);
        }
        if let Some(v) = get("RATE_LIMIT_WINDOW") {
            set_parsed(&mut self.rate_limit.window_ms, "RATE_LIMIT_WINDOW", &v);
        }
        if let Some(v) = get("RATE_LIMIT_MAX") {
            set_parsed(&mut self.rate_limit.max_requests, "RATE_LIMIT_MAX", &v);
        }
        if let Some(v) = get("CORS_ORIGIN") {
            self.server.cors_origin = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            set_parsed(&mut self.logging.format, "LOG_FORMAT", &v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            set_parsed(&mut self.logging.level, "LOG_LEVEL", &v);
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.port == 0 {
            errors.push("server port must be between 1 and 65535".to_string());
        }
        if self.server.host.trim().is_empty() {
            errors.push("server host must not be empty".to_string());
        }

        if self.scraping.timeout_ms == 0 {
            errors.push("timeout_ms must be positive".to_string());
        }
        if self.scraping.connect_timeout_ms == 0 {
            errors.push("connect_timeout_ms must be positive".to_string());
        }
        if self.scraping.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.scraping.max_content_size == 0 {
            errors.push("max_content_size must be positive".to_string());
        }
        if self.scraping.retry_limit > MAX_RETRY_LIMIT {
            errors.push(format!("retry_limit must be <= {}", MAX_RETRY_LIMIT));
        }

        if self.rate_limit.enabled {
            if self.rate_limit.window_ms == 0 {
                errors.push("rate limit window_ms must be positive".to_string());
            }
            if self.rate_limit.max_requests == 0 {
                errors.push("rate limit max_requests must be positive".to_string());
            }
        }

        if self
            .validation
            .blocked_prefixes
            .iter()
            .any(|p| p.trim().is_empty())
        {
            errors.push("blocked_prefixes must not contain empty entries".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

fn set_parsed<T>(target: &mut T, key: &str, value: &str)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(e) => tracing::warn!("Ignoring invalid {}='{}': {}", key, value, e),
    }
}
