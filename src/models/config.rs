//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::services::encoding;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listing page and HTTP behavior
    #[serde(default)]
    pub source: SourceConfig,

    /// Locations of persisted state
    #[serde(default)]
    pub storage: StorageConfig,

    /// Markup selectors for listing anchors
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// URL canonicalization rules
    #[serde(default)]
    pub normalize: NormalizeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.source.listing_url).map_err(|e| {
            AppError::validation(format!(
                "source.listing_url '{}' is not a valid URL: {e}",
                self.source.listing_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation("source.listing_url must be http(s)"));
        }
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == Some(0) {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if encoding::lookup(&self.source.default_encoding).is_none() {
            return Err(AppError::validation(format!(
                "source.default_encoding '{}' is not a known encoding",
                self.source.default_encoding
            )));
        }
        if self.extraction.container_selector.trim().is_empty()
            || self.extraction.title_selector.trim().is_empty()
        {
            return Err(AppError::validation("extraction selectors must not be empty"));
        }
        if self.extraction.link_attr.trim().is_empty() {
            return Err(AppError::validation("extraction.link_attr is empty"));
        }
        if self.storage.state_path == self.storage.new_report_path {
            return Err(AppError::validation(
                "storage.state_path and storage.new_report_path must differ",
            ));
        }
        Ok(())
    }
}

/// Listing page location and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page to poll; also the base for relative listing links
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds. Unset means the scheduler polices hangs.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Encoding used when neither headers nor markup declare one
    #[serde(default = "defaults::default_encoding")]
    pub default_encoding: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: defaults::listing_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: None,
            default_encoding: defaults::default_encoding(),
        }
    }
}

/// Persisted state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Seen-set file, rewritten on every successful run
    #[serde(default = "defaults::state_path")]
    pub state_path: PathBuf,

    /// Per-run report of new listings
    #[serde(default = "defaults::new_report_path")]
    pub new_report_path: PathBuf,

    /// Exclusive run lock
    #[serde(default = "defaults::lock_path")]
    pub lock_path: PathBuf,

    /// Age after which a leftover lock is considered abandoned
    #[serde(default = "defaults::stale_lock_secs")]
    pub stale_lock_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: defaults::state_path(),
            new_report_path: defaults::new_report_path(),
            lock_path: defaults::lock_path(),
            stale_lock_secs: defaults::stale_lock_secs(),
        }
    }
}

impl StorageConfig {
    /// Point the seen set at `path` and keep the lock beside it.
    pub fn relocate_state(&mut self, path: PathBuf) {
        self.lock_path = path.with_file_name(".lock");
        self.state_path = path;
    }
}

/// Where listing anchors live in the page markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// CSS selector for the heading block wrapping each title
    #[serde(default = "defaults::container_selector")]
    pub container_selector: String,

    /// CSS selector for the title anchor inside the container
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// HTML attribute holding the listing link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            container_selector: defaults::container_selector(),
            title_selector: defaults::title_selector(),
            link_attr: defaults::link_attr(),
        }
    }
}

/// URL canonicalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Query parameters dropped by exact, case-sensitive name
    #[serde(default = "defaults::tracking_params")]
    pub tracking_params: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            tracking_params: defaults::tracking_params(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn listing_url() -> String {
        "https://euratec.mobile.bg/obiavi/avtomobili-dzhipove/skoda/superb/avtomatichna?extended=1"
            .into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; carwatch/0.1)".into()
    }
    pub fn default_encoding() -> String {
        "windows-1251".into()
    }

    // Storage defaults
    pub fn state_path() -> PathBuf {
        PathBuf::from("state/seen.json")
    }
    pub fn new_report_path() -> PathBuf {
        PathBuf::from("state/new.json")
    }
    pub fn lock_path() -> PathBuf {
        PathBuf::from("state/.lock")
    }
    pub fn stale_lock_secs() -> u64 {
        3600
    }

    // Extraction defaults
    pub fn container_selector() -> String {
        "div.zaglavie".into()
    }
    pub fn title_selector() -> String {
        "a.title".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }

    // Normalize defaults
    pub fn tracking_params() -> Vec<String> {
        [
            "utm_source",
            "utm_medium",
            "utm_campaign",
            "utm_term",
            "utm_content",
            "fbclid",
            "gclid",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.source.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_default_encoding() {
        let mut config = Config::default();
        config.source.default_encoding = "klingon-8".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_shared_state_and_report_path() {
        let mut config = Config::default();
        config.storage.new_report_path = config.storage.state_path.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_listing_url() {
        let mut config = Config::default();
        config.source.listing_url = "ftp://example.com/list".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn relocated_state_takes_its_lock_along() {
        let mut storage = StorageConfig::default();
        storage.relocate_state(PathBuf::from("/var/lib/carwatch/seen.json"));

        assert_eq!(storage.state_path, PathBuf::from("/var/lib/carwatch/seen.json"));
        assert_eq!(storage.lock_path, PathBuf::from("/var/lib/carwatch/.lock"));
        assert_eq!(storage.new_report_path, PathBuf::from("state/new.json"));
    }

    #[test]
    fn relocated_bare_state_file_locks_in_cwd() {
        let mut storage = StorageConfig::default();
        storage.relocate_state(PathBuf::from("seen.json"));
        assert_eq!(storage.lock_path, PathBuf::from(".lock"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [source]
            listing_url = "https://example.com/cars"

            [normalize]
            tracking_params = ["ref"]
            "#,
        )
        .unwrap();

        assert_eq!(config.source.listing_url, "https://example.com/cars");
        assert_eq!(config.source.default_encoding, "windows-1251");
        assert_eq!(config.source.timeout_secs, None);
        assert_eq!(config.storage.state_path, PathBuf::from("state/seen.json"));
        assert_eq!(config.normalize.tracking_params, vec!["ref".to_string()]);
        assert_eq!(config.extraction.title_selector, "a.title");
    }
}
