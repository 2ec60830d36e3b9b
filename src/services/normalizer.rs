//! Listing URL canonicalization.
//!
//! Two links that differ only by fragment, trailing slash or a tracking query
//! parameter name the same advertisement and must map to one canonical URL.

use std::collections::HashSet;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Listing, NormalizeConfig};

/// Turns listing links into canonical absolute URLs.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    base: Url,
    tracking_params: HashSet<String>,
}

impl UrlNormalizer {
    /// Create a normalizer resolving relative links against `base_url`.
    pub fn new(base_url: &str, config: &NormalizeConfig) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| AppError::invalid_url(base_url, e))?;

        Ok(Self {
            base,
            tracking_params: config.tracking_params.iter().cloned().collect(),
        })
    }

    /// Canonical URL of a listing.
    pub fn normalize(&self, listing: &Listing) -> Result<String> {
        self.normalize_str(&listing.url)
    }

    /// Canonicalize a raw link.
    ///
    /// `normalize_str(normalize_str(u)) == normalize_str(u)` for every link
    /// that normalizes successfully.
    pub fn normalize_str(&self, raw: &str) -> Result<String> {
        let mut url = self
            .base
            .join(raw.trim())
            .map_err(|e| AppError::invalid_url(raw, e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::invalid_url(
                raw,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(AppError::invalid_url(raw, "missing host"));
        }

        url.set_fragment(None);
        self.strip_tracking_params(&mut url);
        strip_trailing_slash(&mut url);

        Ok(url.to_string())
    }

    /// Drop tracking parameters by exact name, keeping the remaining pairs
    /// byte-for-byte and in their original order.
    fn strip_tracking_params(&self, url: &mut Url) {
        let Some(query) = url.query() else {
            return;
        };

        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let name = pair.split('=').next().unwrap_or_default();
                !self.tracking_params.contains(name)
            })
            .collect();

        let kept = kept.join("&");
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept));
        }
    }
}

/// Remove trailing slashes from the path; the root path stays `/`.
fn strip_trailing_slash(url: &mut Url) {
    let path = url.path();
    if path.len() <= 1 || !path.ends_with('/') {
        return;
    }

    let trimmed = path.trim_end_matches('/');
    let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
    url.set_path(&trimmed);
}
