//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API. Every body carries a boolean
//! `success` flag.

use serde::{Deserialize, Serialize};

use crate::scraping::{ApiError, ErrorKind, PageMetadata};

/// Successful scrape response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub data: PageMetadata,
}

impl ScrapeResponse {
    pub fn new(data: PageMetadata) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub version: String,
    pub environment: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Short error description
    pub error: String,
    /// Longer explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Same tag under the field name older clients read
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    /// Underlying error text (development mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            kind: None,
            error_type: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self.error_type = Some(kind);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// 400 body for a rejected target URL
    pub fn invalid_url(reason: impl Into<String>) -> Self {
        Self::new("Invalid URL")
            .with_message(reason)
            .with_kind(ErrorKind::InvalidUrl)
    }

    /// Body for a classified scrape failure
    pub fn from_api_error(err: &ApiError, include_details: bool) -> Self {
        let response = Self::new(err.message.clone()).with_kind(err.kind);
        if include_details {
            response.with_details(err.detail.clone())
        } else {
            response
        }
    }

    pub fn endpoint_not_found() -> Self {
        Self::new("Endpoint not found")
            .with_message("Available endpoints: GET /, GET /meta-scraper, GET /health")
    }

    pub fn too_many_requests(max_requests: u32, window: &str) -> Self {
        Self::new("Too many requests").with_message(format!(
            "Rate limit exceeded. Maximum {} requests per {} allowed.",
            max_requests, window
        ))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("Internal server error").with_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_invalid_url_body() {
        let body = serde_json::to_value(ErrorResponse::invalid_url("URL cannot be empty")).unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Invalid URL",
                "message": "URL cannot be empty",
                "kind": "INVALID_URL",
                "type": "INVALID_URL"
            })
        );
    }

    #[test]
    fn test_api_error_details_only_when_requested() {
        let err = ApiError {
            status: StatusCode::REQUEST_TIMEOUT,
            kind: ErrorKind::TimeoutError,
            message: "Request timeout - the website took too long to respond".to_string(),
            detail: "Timeout after 10s".to_string(),
        };

        let hidden = serde_json::to_value(ErrorResponse::from_api_error(&err, false)).unwrap();
        assert_eq!(hidden["kind"], "TIMEOUT_ERROR");
        assert_eq!(hidden["type"], "TIMEOUT_ERROR");
        assert!(hidden.get("details").is_none());
        assert!(hidden.get("message").is_none());

        let shown = serde_json::to_value(ErrorResponse::from_api_error(&err, true)).unwrap();
        assert_eq!(shown["details"], "Timeout after 10s");
    }

    #[test]
    fn test_too_many_requests_message() {
        let body = ErrorResponse::too_many_requests(100, "minute");
        assert_eq!(
            body.message.as_deref(),
            Some("Rate limit exceeded. Maximum 100 requests per minute allowed.")
        );
    }
}
