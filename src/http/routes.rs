//! HTTP API Route Definitions

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};
use super::rate_limit::{rate_limit_middleware, RateLimitState};

/// Create the API router with all routes
///
/// Unknown paths and unsupported methods on known paths both get the JSON 404.
/// Rate limiting, when enabled, covers every route including the fallback.
pub fn create_router(app_state: AppState, rate_limit: Option<RateLimitState>) -> Router {
    let router = Router::new()
        .route("/", get(handlers::index).fallback(handlers::not_found))
        .route("/health", get(handlers::health).fallback(handlers::not_found))
        .route(
            "/meta-scraper",
            get(handlers::meta_scraper).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    match rate_limit {
        Some(limits) => router.layer(middleware::from_fn_with_state(
            limits,
            rate_limit_middleware,
        )),
        None => router,
    }
}
