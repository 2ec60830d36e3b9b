// src/pipeline/poll.rs

//! Listing poll pipeline.
//!
//! fetch → decode → extract → normalize → lock → load seen → diff → commit

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{Config, Listing, NewReport};
use crate::pipeline::diff::diff_and_update;
use crate::services::{EncodingResolver, ListingExtractor, SelectorExtractor, UrlNormalizer};
use crate::storage::StateStore;
use crate::utils::http::{FetchedPage, PageSource};

/// Exit status: run completed, nothing new.
pub const EXIT_NO_NEW: u8 = 0;
/// Exit status: run failed.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status: run completed with new listings.
pub const EXIT_NEW_FOUND: u8 = 2;

/// Summary of a successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Distinct listings on the page after normalization
    pub found: usize,
    /// Listings absent from the seen set at run start, with canonical URLs
    pub new_listings: Vec<Listing>,
    /// Size of the seen set after this run
    pub seen_total: usize,
}

impl PollOutcome {
    pub fn has_new(&self) -> bool {
        !self.new_listings.is_empty()
    }

    /// Process exit status for the scheduler.
    pub fn exit_code(&self) -> u8 {
        if self.has_new() {
            EXIT_NEW_FOUND
        } else {
            EXIT_NO_NEW
        }
    }
}

/// Wires the page processing services together for one poll.
pub struct Poller {
    listing_url: String,
    resolver: EncodingResolver,
    extractor: Box<dyn ListingExtractor>,
    normalizer: UrlNormalizer,
}

impl Poller {
    /// Build a poller using the configured selector extractor.
    pub fn new(config: &Config) -> Result<Self> {
        let extractor = SelectorExtractor::new(&config.extraction)?;
        Self::with_extractor(config, Box::new(extractor))
    }

    /// Build a poller with a custom extraction strategy.
    pub fn with_extractor(config: &Config, extractor: Box<dyn ListingExtractor>) -> Result<Self> {
        Ok(Self {
            listing_url: config.source.listing_url.clone(),
            resolver: EncodingResolver::new(&config.source.default_encoding),
            extractor,
            normalizer: UrlNormalizer::new(&config.source.listing_url, &config.normalize)?,
        })
    }

    /// Decode a page and return its distinct listings with canonical URLs,
    /// in document order.
    pub fn parse_page(&self, page: &FetchedPage) -> Vec<Listing> {
        let decoded = self
            .resolver
            .decode(&page.body, page.content_type.as_deref());
        log::debug!(
            "Decoded page as {} ({:?})",
            decoded.encoding.name(),
            decoded.source
        );

        let raw = self.extractor.extract(&decoded.text);
        if raw.is_empty() {
            log::warn!(
                "No listings found on {}; the page layout may have changed",
                self.listing_url
            );
        }

        let mut seen_urls = HashSet::new();
        let mut listings = Vec::with_capacity(raw.len());
        for listing in raw {
            match self.normalizer.normalize(&listing) {
                Ok(url) => {
                    if seen_urls.insert(url.clone()) {
                        listings.push(Listing::new(listing.title, url));
                    }
                }
                Err(e) => log::warn!("Skipping listing '{}': {}", listing.title, e),
            }
        }
        listings
    }

    /// Run one poll against `source`, persisting through `store`.
    pub async fn run(&self, source: &dyn PageSource, store: &dyn StateStore) -> Result<PollOutcome> {
        log::info!("Fetching {}", self.listing_url);
        let page = source.fetch(&self.listing_url).await?;

        let listings = self.parse_page(&page);
        log::info!("Found {} listings", listings.len());

        // Held until the end of the diff-and-persist phase.
        let _lock = store.lock().await?;

        let prior = store.load_seen().await;
        let diff = diff_and_update(listings.iter().map(|l| l.url.as_str()), &prior);

        let fresh: HashSet<&str> = diff.new_urls.iter().map(String::as_str).collect();
        let new_listings: Vec<Listing> = listings
            .iter()
            .filter(|l| fresh.contains(l.url.as_str()))
            .cloned()
            .collect();

        let report = NewReport::new(new_listings);
        let meta = store.commit(&diff.updated_seen, &report).await?;

        Ok(PollOutcome {
            found: listings.len(),
            new_listings: report.new_cars,
            seen_total: meta.seen_count,
        })
    }
}

/// Run a single poll with the configured extractor.
pub async fn run_poll(
    config: &Config,
    source: &dyn PageSource,
    store: &dyn StateStore,
) -> Result<PollOutcome> {
    Poller::new(config)?.run(source, store).await
}
