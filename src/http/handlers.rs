//! HTTP API Request Handlers
//!
//! Handlers that map HTTP requests onto `MetaScraper` operations.

use axum::{
    extract::{RawQuery, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::scraping::{MetaScraper, ScrapeError};

use super::types::*;

const SERVICE_NAME: &str = "Meta Scraper API";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<MetaScraper>,
    pub config: Arc<Config>,
}

/// Metadata extraction endpoint
pub async fn meta_scraper(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let target = url_param(query.as_deref());
    debug!(url = target.as_deref().unwrap_or_default(), "HTTP meta-scraper request");

    match state.scraper.scrape(target.as_deref()).await {
        Ok(data) => (StatusCode::OK, Json(ScrapeResponse::new(data))).into_response(),
        Err(ScrapeError::InvalidUrl(e)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::invalid_url(e.to_string())),
        )
            .into_response(),
        Err(ScrapeError::Failed(err)) => {
            let dev = state.config.server.environment.is_development();
            (err.status, Json(ErrorResponse::from_api_error(&err, dev))).into_response()
        }
    }
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        success: true,
        message: "Meta Scraper API is running".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.server.environment.to_string(),
    })
}

/// Service descriptor
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let limits = &state.config.rate_limit;
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Extract metadata from web pages",
        "endpoints": {
            "GET /meta-scraper": {
                "description": "Extract metadata from a URL",
                "parameters": { "url": "The URL to scrape (required)" },
                "example": "/meta-scraper?url=https://example.com"
            },
            "GET /health": { "description": "Check API health status" }
        },
        "usage": {
            "example_request": "GET /meta-scraper?url=https://github.com",
            "example_response": {
                "success": true,
                "data": {
                    "title": "GitHub",
                    "description": null,
                    "url": "https://github.com",
                    "image": null
                }
            }
        },
        "rateLimit": {
            "enabled": limits.enabled,
            "requests": limits.max_requests,
            "window": limits.window_label()
        }
    }))
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    warn!(path = uri.path(), "Endpoint not found");
    (StatusCode::NOT_FOUND, Json(ErrorResponse::endpoint_not_found()))
}

/// The `url` query value, when given exactly once
///
/// A repeated parameter is not a single string and is treated as missing.
fn url_param(query: Option<&str>) -> Option<String> {
    let mut values = url::form_urlencoded::parse(query?.as_bytes())
        .filter(|(key, _)| key == "url")
        .map(|(_, value)| value);

    match (values.next(), values.next()) {
        (Some(value), None) => Some(Cow::into_owned(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_param() {
        assert_eq!(url_param(None), None);
        assert_eq!(url_param(Some("")), None);
        assert_eq!(url_param(Some("other=1")), None);
        assert_eq!(url_param(Some("url=")).as_deref(), Some(""));
        assert_eq!(
            url_param(Some("url=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc")).as_deref(),
            Some("https://example.com/a?b=c")
        );
        assert_eq!(
            url_param(Some("foo=bar&url=github.com")).as_deref(),
            Some("github.com")
        );
    }

    #[test]
    fn test_repeated_url_param_is_missing() {
        assert_eq!(url_param(Some("url=a.com&url=b.com")), None);
    }
}
