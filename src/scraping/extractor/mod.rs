//! Metadata extraction from HTML
//!
//! Pulls the four link-preview fields out of a parsed document:
//! - title
//! - description
//! - canonical URL
//! - preview image
//!
//! Each field walks a short fallback chain over Open Graph, Twitter Card and
//! plain meta tags. Missing fields are `None`; only a document that is not
//! HTML at all is an error.

mod metadata;
mod types;

pub use types::*;

use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

/// How much of the body to inspect when deciding whether it is markup
const SNIFF_LENGTH: usize = 1024;

/// Meta names and properties consulted during extraction
const META_NAMES: &[&str] = &[
    "og:title",
    "og:description",
    "og:url",
    "og:image",
    "og:image:url",
    "og:image:secure_url",
    "twitter:title",
    "twitter:description",
    "twitter:image",
    "twitter:image:src",
    "title",
    "description",
];

/// Link-preview metadata extractor
pub struct MetadataExtractor {
    /// Pre-compiled meta selectors: maps meta name → (name selector, property selector)
    pub(crate) meta_selectors: HashMap<String, (Option<Selector>, Option<Selector>)>,
    pub(crate) title_selector: Option<Selector>,
    pub(crate) h1_selector: Option<Selector>,
    pub(crate) canonical_selector: Option<Selector>,
    pub(crate) image_src_selector: Option<Selector>,
}

impl MetadataExtractor {
    /// Create a new metadata extractor
    pub fn new() -> Self {
        let mut meta_selectors = HashMap::with_capacity(META_NAMES.len());
        for name in META_NAMES {
            let name_sel = Selector::parse(&format!("meta[name='{}']", name)).ok();
            let prop_sel = Selector::parse(&format!("meta[property='{}']", name)).ok();
            meta_selectors.insert(name.to_string(), (name_sel, prop_sel));
        }

        Self {
            meta_selectors,
            title_selector: Selector::parse("title").ok(),
            h1_selector: Selector::parse("h1").ok(),
            canonical_selector: Selector::parse("link[rel='canonical']").ok(),
            image_src_selector: Selector::parse("link[rel='image_src']").ok(),
        }
    }

    /// Extract metadata from an HTML document fetched from `final_url`
    pub fn extract(&self, html: &str, final_url: &Url) -> Result<ExtractedMetadata, ExtractError> {
        check_markup(html)?;

        let document = Html::parse_document(html);

        Ok(ExtractedMetadata {
            title: self.extract_title(&document),
            description: self.extract_description(&document),
            url: self.extract_canonical(&document, final_url),
            image: self.extract_image(&document, final_url),
        })
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject bodies that cannot be parsed as HTML at all
fn check_markup(html: &str) -> Result<(), ExtractError> {
    let trimmed = html.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    if trimmed.contains('\0') {
        return Err(ExtractError::NotHtml("contains NUL bytes".to_string()));
    }

    let mut end = trimmed.len().min(SNIFF_LENGTH);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    let head = &trimmed[..end];
    let looks_like_markup = head.char_indices().any(|(i, c)| {
        c == '<'
            && head[i + 1..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_alphabetic() || n == '!' || n == '?')
    });
    if !looks_like_markup {
        return Err(ExtractError::NotHtml("no markup found".to_string()));
    }
    Ok(())
}
