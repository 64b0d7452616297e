//! Extractor output and error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata fields found in a page
///
/// Every field is optional; a field the page does not declare is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// Page title
    pub title: Option<String>,
    /// Page description
    pub description: Option<String>,
    /// Canonical URL, absolute
    pub url: Option<String>,
    /// Preview image URL, absolute
    pub image: Option<String>,
}

impl ExtractedMetadata {
    pub fn has_title(&self) -> bool {
        self.title.is_some()
    }

    pub fn has_description(&self) -> bool {
        self.description.is_some()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Errors that make a document unusable as a whole
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Document is empty")]
    EmptyDocument,
    #[error("Document is not HTML: {0}")]
    NotHtml(String),
}
