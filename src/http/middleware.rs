//! Cross-cutting HTTP middleware: security headers, request logging, panics

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use std::time::Instant;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};
use uuid::Uuid;

use super::rate_limit::client_ip;
use super::types::ErrorResponse;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const CONTENT_SECURITY_POLICY: &str = "default-src 'self';style-src 'self' 'unsafe-inline';\
script-src 'self';img-src 'self' data: https:;connect-src 'self';font-src 'self';\
object-src 'none';media-src 'self';frame-src 'none';base-uri 'self';form-action 'self';\
frame-ancestors 'self';script-src-attr 'none';upgrade-insecure-requests";

/// Response headers added to every response that does not already set them
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// One `SetResponseHeaderLayer` per security header
pub fn security_header_layers() -> Vec<SetResponseHeaderLayer<HeaderValue>> {
    SECURITY_HEADERS
        .iter()
        .map(|&(name, value)| {
            SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
        })
        .collect()
}

/// Log one line per completed request and tag the response with a request id
pub async fn request_logger(
    State(trust_proxy): State<bool>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = client_ip(&request, trust_proxy);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        ip = %ip,
        user_agent = %user_agent,
        "Request completed"
    );

    response
}

/// Turn a handler panic into the JSON 500 envelope
///
/// The panic message is only echoed back in development.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, development: bool) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    error!(panic = %detail, "Unhandled error in request handler");

    let message = if development {
        detail
    } else {
        "Something went wrong".to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal_error(message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_header_names_are_valid() {
        assert_eq!(security_header_layers().len(), SECURITY_HEADERS.len());
        for (name, _) in SECURITY_HEADERS {
            assert!(HeaderName::try_from(*name).is_ok(), "{}", name);
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_response_hides_detail_outside_development() {
        let response = panic_response(Box::new("boom"), false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "Something went wrong");

        let response = panic_response(Box::new(String::from("boom")), true);
        assert_eq!(body_json(response).await["message"], "boom");
    }
}
