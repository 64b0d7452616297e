//! Field extraction: title, description, canonical URL, preview image

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::MetadataExtractor;

impl MetadataExtractor {
    /// Extract page title
    pub(super) fn extract_title(&self, document: &Html) -> Option<String> {
        self.first_meta(document, &["og:title", "twitter:title", "title"])
            .or_else(|| Self::first_text(document, self.title_selector.as_ref()))
            .or_else(|| Self::first_text(document, self.h1_selector.as_ref()))
    }

    /// Extract page description
    pub(super) fn extract_description(&self, document: &Html) -> Option<String> {
        self.first_meta(document, &["og:description", "twitter:description", "description"])
    }

    /// Extract canonical URL, resolved against the page URL
    pub(super) fn extract_canonical(&self, document: &Html, base: &Url) -> Option<String> {
        self.canonical_selector
            .as_ref()
            .and_then(|selector| document.select(selector).next())
            .and_then(|elem| elem.value().attr("href"))
            .and_then(|href| resolve_url(base, href))
            .or_else(|| {
                self.get_meta_content(document, "og:url")
                    .and_then(|href| resolve_url(base, &href))
            })
    }

    /// Extract preview image, resolved against the page URL
    pub(super) fn extract_image(&self, document: &Html, base: &Url) -> Option<String> {
        let candidates = [
            "og:image",
            "og:image:url",
            "og:image:secure_url",
            "twitter:image",
            "twitter:image:src",
        ];

        candidates
            .iter()
            .filter_map(|name| self.get_meta_content(document, name))
            .find_map(|href| resolve_url(base, &href))
            .or_else(|| {
                self.image_src_selector
                    .as_ref()
                    .and_then(|selector| document.select(selector).next())
                    .and_then(|elem| elem.value().attr("href"))
                    .and_then(|href| resolve_url(base, href))
            })
    }

    /// First non-empty meta value among `names`, in order
    fn first_meta(&self, document: &Html, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find_map(|name| self.get_meta_content(document, name))
    }

    /// Get meta content by name or property, using pre-compiled selectors when available
    pub(super) fn get_meta_content(&self, document: &Html, name: &str) -> Option<String> {
        if let Some((name_sel, prop_sel)) = self.meta_selectors.get(name) {
            return [name_sel, prop_sel]
                .into_iter()
                .flatten()
                .find_map(|selector| Self::meta_value(document, selector));
        }

        // Fallback: parse selectors dynamically for uncached names
        ["name", "property"].iter().find_map(|attr| {
            Selector::parse(&format!("meta[{}='{}']", attr, name))
                .ok()
                .and_then(|selector| Self::meta_value(document, &selector))
        })
    }

    /// Content of the first matching meta tag that has a non-empty value
    fn meta_value(document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .filter_map(|elem| elem.value().attr("content"))
            .find_map(clean_text)
    }

    fn first_text(document: &Html, selector: Option<&Selector>) -> Option<String> {
        let selector = selector?;
        document
            .select(selector)
            .next()
            .and_then(|elem: ElementRef<'_>| clean_text(&elem.text().collect::<String>()))
    }
}

/// Collapse whitespace; empty results are treated as missing
fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Resolve a possibly relative reference against the page URL, keeping only http(s)
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
