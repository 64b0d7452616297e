//! Meta Scraper: link-preview metadata over HTTP
//!
//! Given a URL, the service fetches the page and returns its title,
//! description, canonical URL and preview image:
//! - SSRF-guarded URL validation (local and private hosts are refused)
//! - Remote fetching with timeouts, bounded redirects and retries
//! - OpenGraph / Twitter Card / HTML fallback extraction
//! - Stable error taxonomy mapped onto HTTP statuses

pub mod config;
pub mod http;
pub mod scraping;

pub use config::Config;
