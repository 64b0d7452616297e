//! Link-preview scraping core
//!
//! A scrape request runs once through four stages:
//! - `UrlValidator`: normalizes the target and blocks local/private hosts
//! - `PageFetcher`: fetches the page (timeout, retries, redirects)
//! - `MetadataExtractor`: pulls title, description, canonical URL and image
//! - `classify`: turns any fetch or extraction failure into an `ApiError`
//!
//! `MetaScraper` sequences the stages.

pub mod classifier;
pub mod extractor;
pub mod fetcher;
pub mod service;
pub mod validator;

pub use classifier::{classify, ApiError, ErrorKind, ScrapeFailure};
pub use extractor::{ExtractError, ExtractedMetadata, MetadataExtractor};
pub use fetcher::{FetchEngine, FetchError, FetchedPage, PageFetcher};
pub use service::{MetaScraper, PageMetadata, ScrapeError};
pub use validator::{UrlValidationError, UrlValidator, ValidatedUrl};
