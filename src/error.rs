// src/error.rs

//! Unified error handling for the listing watcher.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Maximum number of body characters kept in an HTTP status error.
pub const BODY_SNIPPET_CHARS: usize = 300;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status}\n{snippet}")]
    HttpStatus { status: u16, snippet: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// A listing URL could not be turned into a canonical absolute URL
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Another run holds the state lock
    #[error("State is locked by another run ({})", .path.display())]
    Locked { path: PathBuf },
}

impl AppError {
    /// Create an HTTP status error, keeping only the head of the body.
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::HttpStatus {
            status,
            snippet: body.chars().take(BODY_SNIPPET_CHARS).collect(),
        }
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a lock contention error.
    pub fn locked(path: &Path) -> Self {
        Self::Locked {
            path: path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_truncates_body() {
        let body = "x".repeat(1000);
        match AppError::http_status(503, &body) {
            AppError::HttpStatus { status, snippet } => {
                assert_eq!(status, 503);
                assert_eq!(snippet.chars().count(), BODY_SNIPPET_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_status_truncates_on_char_boundary() {
        let body = "я".repeat(400);
        let err = AppError::http_status(500, &body);
        assert!(err.to_string().starts_with("HTTP 500\n"));
    }
}
