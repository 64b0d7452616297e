//! HTTP API Server
//!
//! Axum-based HTTP server for the meta-scraper API.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::scraping::MetaScraper;

use super::handlers::AppState;
use super::middleware::{panic_response, request_logger, security_header_layers};
use super::rate_limit::RateLimitState;
use super::routes::create_router;

/// HTTP API server
pub struct HttpServer {
    config: Arc<Config>,
    scraper: Arc<MetaScraper>,
    rate_limit: Option<RateLimitState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: Arc<Config>, scraper: Arc<MetaScraper>) -> Self {
        let rate_limit = RateLimitState::new(&config.rate_limit, config.server.trust_proxy);
        Self {
            config,
            scraper,
            rate_limit,
        }
    }

    /// Build the router with the full middleware stack
    pub fn router(&self) -> Router {
        let app_state = AppState {
            scraper: self.scraper.clone(),
            config: self.config.clone(),
        };

        let mut app = create_router(app_state, self.rate_limit.clone()).layer(self.cors());

        for layer in security_header_layers() {
            app = app.layer(layer);
        }

        let development = self.config.server.environment.is_development();
        app.layer(middleware::from_fn_with_state(
            self.config.server.trust_proxy,
            request_logger,
        ))
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| panic_response(err, development),
        ))
    }

    fn cors(&self) -> CorsLayer {
        let origin = match self.config.server.cors_origins() {
            None => AllowOrigin::any(),
            Some(origins) => {
                let parsed: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match HeaderValue::from_str(o) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!(origin = %o, "Ignoring invalid CORS origin");
                            None
                        }
                    })
                    .collect();
                AllowOrigin::list(parsed)
            }
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([
                header::ORIGIN,
                header::HeaderName::from_static("x-requested-with"),
                header::CONTENT_TYPE,
                header::ACCEPT,
            ])
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.server.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .context("Failed to read HTTP listener address")?;
        info!("HTTP API server listening on http://{}", addr);

        let pruner = self.rate_limit.clone().map(|limits| {
            let period = self.config.rate_limit.window();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    limits.prune();
                }
            })
        });

        let result = axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("HTTP server shutting down");
        })
        .await
        .context("HTTP server error");

        if let Some(handle) = pruner {
            handle.abort();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(config: Config) -> HttpServer {
        let scraper = MetaScraper::from_config(&config).unwrap();
        HttpServer::new(Arc::new(config), Arc::new(scraper))
    }

    #[test]
    fn test_rate_limit_follows_config() {
        let mut config = Config::default();
        assert!(server(config.clone()).rate_limit.is_some());

        config.rate_limit.enabled = false;
        assert!(server(config).rate_limit.is_none());
    }

    #[test]
    fn test_router_builds_with_origin_list() {
        let mut config = Config::default();
        config.server.cors_origin = "https://a.example, https://b.example".to_string();
        let _ = server(config).router();
    }
}
