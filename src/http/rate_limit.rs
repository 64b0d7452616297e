//! Per-client rate limiting middleware
//!
//! Each client IP gets its own GCRA bucket: up to `max_requests` in a burst,
//! refilling evenly over `window_ms`.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

use crate::config::RateLimitConfig;

use super::types::ErrorResponse;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared state for rate limiting
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    max_requests: u32,
    window_label: Arc<str>,
    trust_proxy: bool,
}

impl RateLimitState {
    /// Build the limiter, or `None` when rate limiting is disabled
    pub fn new(config: &RateLimitConfig, trust_proxy: bool) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let burst = NonZeroU32::new(config.max_requests)?;
        let quota = match Quota::with_period(config.window() / config.max_requests) {
            Some(quota) => quota.allow_burst(burst),
            None => {
                warn!(
                    window_ms = config.window_ms,
                    max_requests = config.max_requests,
                    "Rate limit window too small for request ceiling, rate limiting disabled"
                );
                return None;
            }
        };

        Some(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            max_requests: config.max_requests,
            window_label: config.window_label().into(),
            trust_proxy,
        })
    }

    /// Record one request for `ip`; false when over the limit
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Drop buckets that have fully refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of tracked client buckets
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    pub fn client_ip(&self, request: &Request<Body>) -> IpAddr {
        client_ip(request, self.trust_proxy)
    }

    fn rejection(&self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::too_many_requests(
                self.max_requests,
                &self.window_label,
            )),
        )
            .into_response()
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limits): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = limits.client_ip(&request);
    if limits.check(ip) {
        return next.run(request).await;
    }

    warn!(ip = %ip, path = request.uri().path(), "Rate limit exceeded");
    limits.rejection()
}

/// Resolve the client address for a request
///
/// Falls back to the unspecified address when neither a trusted
/// `X-Forwarded-For` nor the TCP peer is available.
pub fn client_ip(request: &Request<Body>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(request.headers()) {
            return ip;
        }
    }
    peer_ip(request).unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Address of the TCP peer, when the server was started with connect info
pub fn peer_ip(request: &Request<Body>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Last hop of `X-Forwarded-For`, as appended by the nearest proxy
pub fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .last()
        .and_then(|hop| hop.trim().parse().ok())
}
