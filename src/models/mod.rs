// src/models/mod.rs

//! Domain models for the listing watcher.

mod config;
mod listing;
mod state;

// Re-export all public types
pub use config::{Config, ExtractionConfig, NormalizeConfig, SourceConfig, StorageConfig};
pub use listing::Listing;
pub use state::{NewReport, SeenState};
