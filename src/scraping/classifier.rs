//! Failure classification
//!
//! Maps fetch and extraction failures onto the client-facing error taxonomy.
//! Classification reads two signals from the raw failure, a transport code and
//! an upstream HTTP status, and applies a fixed precedence: connection
//! failures first, then timeouts, then upstream statuses, then the catch-all.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::extractor::ExtractError;
use super::fetcher::FetchError;

/// Stable error tags returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidUrl,
    ConnectionError,
    TimeoutError,
    AccessDenied,
    NotFound,
    ClientError,
    ServerError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "INVALID_URL",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::NotFound => "NOT_FOUND",
            Self::ClientError => "CLIENT_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCode {
    HostNotFound,
    ConnectionRefused,
    ConnectionFailed,
    TimedOut,
}

impl TransportCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HostNotFound => "host_not_found",
            Self::ConnectionRefused => "connection_refused",
            Self::ConnectionFailed => "connection_failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// What the classifier looks at in a raw failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureSignals {
    pub code: Option<TransportCode>,
    pub http_status: Option<u16>,
}

/// A failure after validation succeeded
#[derive(Debug, Error)]
pub enum ScrapeFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl ScrapeFailure {
    pub fn signals(&self) -> FailureSignals {
        match self {
            Self::Fetch(e) => e.signals(),
            Self::Extract(_) => FailureSignals::default(),
        }
    }
}

impl FetchError {
    pub fn signals(&self) -> FailureSignals {
        let code = match self {
            Self::HostNotFound { .. } => Some(TransportCode::HostNotFound),
            Self::ConnectionRefused { .. } => Some(TransportCode::ConnectionRefused),
            Self::Connect(_) => Some(TransportCode::ConnectionFailed),
            Self::Timeout(_) => Some(TransportCode::TimedOut),
            _ => None,
        };
        FailureSignals {
            code,
            http_status: self.status(),
        }
    }
}

/// Client-facing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Status code returned to the client
    pub status: StatusCode,
    /// Stable error tag
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Underlying error, for logs and development-mode responses only
    pub detail: String,
}

/// Classify a failure into an `ApiError`
pub fn classify(failure: &ScrapeFailure) -> ApiError {
    let (status, kind, message) = classify_signals(failure.signals());
    ApiError {
        status,
        kind,
        message,
        detail: failure.to_string(),
    }
}

/// Apply the classification precedence to a set of failure signals
pub fn classify_signals(signals: FailureSignals) -> (StatusCode, ErrorKind, String) {
    match (signals.code, signals.http_status) {
        (Some(TransportCode::HostNotFound | TransportCode::ConnectionRefused), _) => (
            StatusCode::NOT_FOUND,
            ErrorKind::ConnectionError,
            "Unable to connect to the provided URL".to_string(),
        ),
        (Some(TransportCode::TimedOut), _) => (
            StatusCode::REQUEST_TIMEOUT,
            ErrorKind::TimeoutError,
            "Request timeout - the website took too long to respond".to_string(),
        ),
        (_, Some(403)) => (
            StatusCode::FORBIDDEN,
            ErrorKind::AccessDenied,
            "Access forbidden - the website blocked our request".to_string(),
        ),
        (_, Some(404)) => (
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            "Page not found".to_string(),
        ),
        (_, Some(status @ 400..=499)) => (
            StatusCode::BAD_REQUEST,
            ErrorKind::ClientError,
            format!("Website returned {} status code", status),
        ),
        (_, Some(500..)) => (
            StatusCode::BAD_GATEWAY,
            ErrorKind::ServerError,
            "The target website is experiencing server issues".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::UnknownError,
            "Failed to scrape metadata".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    fn status_error(status: u16) -> ScrapeFailure {
        ScrapeFailure::Fetch(FetchError::Status {
            status,
            url: Url::parse("https://example.com/").unwrap(),
        })
    }

    #[test]
    fn test_connection_failures() {
        let dns = classify(&ScrapeFailure::Fetch(FetchError::HostNotFound {
            host: "nope.invalid".into(),
            message: "dns error".into(),
        }));
        assert_eq!(dns.status, StatusCode::NOT_FOUND);
        assert_eq!(dns.kind, ErrorKind::ConnectionError);
        assert_eq!(dns.message, "Unable to connect to the provided URL");

        let refused = classify(&ScrapeFailure::Fetch(FetchError::ConnectionRefused {
            host: "example.com".into(),
        }));
        assert_eq!(refused.kind, ErrorKind::ConnectionError);
    }

    #[test]
    fn test_other_connect_failures_are_unknown() {
        let err = classify(&ScrapeFailure::Fetch(FetchError::Connect("reset".into())));
        assert_eq!(err.kind, ErrorKind::UnknownError);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_timeout() {
        let err = classify(&ScrapeFailure::Fetch(FetchError::Timeout(Duration::from_secs(10))));
        assert_eq!(err.status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.kind, ErrorKind::TimeoutError);
    }

    #[test]
    fn test_upstream_statuses() {
        let cases = [
            (403, StatusCode::FORBIDDEN, ErrorKind::AccessDenied),
            (404, StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (401, StatusCode::BAD_REQUEST, ErrorKind::ClientError),
            (410, StatusCode::BAD_REQUEST, ErrorKind::ClientError),
            (429, StatusCode::BAD_REQUEST, ErrorKind::ClientError),
            (500, StatusCode::BAD_GATEWAY, ErrorKind::ServerError),
            (503, StatusCode::BAD_GATEWAY, ErrorKind::ServerError),
            (599, StatusCode::BAD_GATEWAY, ErrorKind::ServerError),
        ];
        for (upstream, status, kind) in cases {
            let err = classify(&status_error(upstream));
            assert_eq!(err.status, status, "upstream {}", upstream);
            assert_eq!(err.kind, kind, "upstream {}", upstream);
        }
        assert_eq!(
            classify(&status_error(418)).message,
            "Website returned 418 status code"
        );
    }

    #[test]
    fn test_connection_code_wins_over_status() {
        let signals = FailureSignals {
            code: Some(TransportCode::ConnectionRefused),
            http_status: Some(503),
        };
        let (status, kind, _) = classify_signals(signals);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(kind, ErrorKind::ConnectionError);

        let signals = FailureSignals {
            code: Some(TransportCode::TimedOut),
            http_status: Some(403),
        };
        assert_eq!(classify_signals(signals).1, ErrorKind::TimeoutError);
    }

    #[test]
    fn test_extract_and_misc_failures_are_unknown() {
        let err = classify(&ScrapeFailure::Extract(ExtractError::NotHtml("binary".into())));
        assert_eq!(err.kind, ErrorKind::UnknownError);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to scrape metadata");
        assert!(err.detail.contains("not HTML"));

        for fetch in [
            FetchError::TooManyRedirects,
            FetchError::BlockedRedirect("localhost".into()),
            FetchError::InvalidContentType("image/png".into()),
            FetchError::ContentTooLarge(1 << 30),
        ] {
            assert_eq!(classify(&ScrapeFailure::Fetch(fetch)).kind, ErrorKind::UnknownError);
        }

        // 3xx that escaped redirect handling
        assert_eq!(classify(&status_error(304)).kind, ErrorKind::UnknownError);
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ConnectionError).unwrap(),
            "\"CONNECTION_ERROR\""
        );
        assert_eq!(ErrorKind::TimeoutError.to_string(), "TIMEOUT_ERROR");
    }
}
