//! HTTP API Server Module
//!
//! REST surface for the scraper: `GET /meta-scraper`, `GET /health` and a
//! service descriptor at `GET /`.

pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod types;

pub use server::HttpServer;
