//! Scrape orchestration: validate, fetch, extract, classify

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

use super::classifier::{classify, ApiError, ScrapeFailure};
use super::extractor::{ExtractedMetadata, MetadataExtractor};
use super::fetcher::{FetchConfig, FetchEngine, FetchError, PageFetcher};
use super::validator::{UrlValidationError, UrlValidator, ValidatedUrl};
use crate::config::Config;

/// Metadata returned to clients
///
/// Missing fields serialize as `null`; `url` always has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub image: Option<String>,
}

impl PageMetadata {
    /// Client payload for extracted fields; `url` falls back to `requested`
    pub fn from_extracted(extracted: ExtractedMetadata, requested: &str) -> Self {
        Self {
            title: extracted.title,
            description: extracted.description,
            url: extracted.url.unwrap_or_else(|| requested.to_string()),
            image: extracted.image,
        }
    }
}

/// Why a scrape request did not produce metadata
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    #[error(transparent)]
    Failed(ApiError),
}

/// Request orchestrator
pub struct MetaScraper {
    validator: UrlValidator,
    fetcher: Arc<dyn PageFetcher>,
    extractor: MetadataExtractor,
}

impl MetaScraper {
    pub fn new(validator: UrlValidator, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            validator,
            fetcher,
            extractor: MetadataExtractor::new(),
        }
    }

    /// Build a scraper backed by the HTTP fetch engine
    ///
    /// Redirects are checked against the same blocklist as the request URL.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let validator = UrlValidator::new(&config.validation);
        let engine =
            FetchEngine::with_redirect_guard(FetchConfig::from(&config.scraping), validator.clone())?;
        Ok(Self::new(validator, Arc::new(engine)))
    }

    /// Run one scrape for a raw `url` parameter
    pub async fn scrape(&self, input: Option<&str>) -> Result<PageMetadata, ScrapeError> {
        let target = match self.validator.validate(input) {
            Ok(target) => target,
            Err(e) => {
                warn!(url = input.unwrap_or_default(), reason = %e, "Rejected target URL");
                return Err(ScrapeError::InvalidUrl(e));
            }
        };

        self.scrape_validated(&target).await.map_err(ScrapeError::Failed)
    }

    /// Fetch and extract an already validated URL
    pub async fn scrape_validated(&self, target: &ValidatedUrl) -> Result<PageMetadata, ApiError> {
        let start = Instant::now();
        info!(url = %target.normalized, "Starting metadata extraction");

        let result = self.fetch_and_extract(target).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(extracted) => {
                info!(
                    url = %target.normalized,
                    duration_ms,
                    has_title = extracted.has_title(),
                    has_description = extracted.has_description(),
                    has_image = extracted.has_image(),
                    "Metadata extraction completed"
                );
                Ok(PageMetadata::from_extracted(extracted, &target.normalized))
            }
            Err(failure) => {
                let signals = failure.signals();
                error!(
                    url = %target.normalized,
                    duration_ms,
                    error_code = signals.code.map(|c| c.as_str()),
                    status_code = signals.http_status,
                    error = %failure,
                    "Metadata extraction failed"
                );
                Err(classify(&failure))
            }
        }
    }

    async fn fetch_and_extract(&self, target: &ValidatedUrl) -> Result<ExtractedMetadata, ScrapeFailure> {
        let page = self.fetcher.fetch(&target.parsed).await?;
        Ok(self.extractor.extract(&page.body, &page.final_url)?)
    }
}
