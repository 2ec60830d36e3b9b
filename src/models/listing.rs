//! Listing data structure.

use serde::{Deserialize, Serialize};

/// A car advertisement reference extracted from the listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    /// Whitespace-normalized anchor text
    pub title: String,

    /// Link as found in markup, or its canonical form once normalized
    pub url: String,
}

impl Listing {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Format listing for console output.
    ///
    /// Supported placeholders: `{title}`, `{url}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{url}", &self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let listing = Listing::new("Skoda Superb 2.0 TDI", "https://example.com/ad/1");
        assert_eq!(
            listing.format("{title} - {url}"),
            "Skoda Superb 2.0 TDI - https://example.com/ad/1"
        );
    }
}
