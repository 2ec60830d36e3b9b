//! Listing extraction from page markup.
//!
//! The markup convention of the source site is configuration: swapping the
//! [`ListingExtractor`] implementation is enough to follow a site redesign.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{ExtractionConfig, Listing};

/// Finds title/link pairs in decoded markup.
pub trait ListingExtractor: Send + Sync {
    /// Extract listings in document order. Incomplete anchors are skipped.
    fn extract(&self, html: &str) -> Vec<Listing>;
}

/// Extracts title anchors nested inside a heading container.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    anchor: Selector,
    link_attr: String,
}

impl SelectorExtractor {
    /// Build an extractor from configured selectors.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let selector = format!(
            "{} {}",
            config.container_selector.trim(),
            config.title_selector.trim()
        );

        Ok(Self {
            anchor: parse_selector(&selector)?,
            link_attr: config.link_attr.clone(),
        })
    }

    fn parse_anchor(&self, anchor: ElementRef<'_>) -> Option<Listing> {
        let title = collapse_whitespace(&anchor.text().collect::<String>());
        let url = anchor.value().attr(&self.link_attr)?.trim();

        if title.is_empty() || url.is_empty() {
            log::debug!("Skipping incomplete listing anchor: {:?}", anchor.html());
            return None;
        }

        Some(Listing::new(title, url))
    }
}

impl ListingExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);

        document
            .select(&self.anchor)
            .filter_map(|anchor| self.parse_anchor(anchor))
            .collect()
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
