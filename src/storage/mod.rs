//! Storage abstractions for the seen set and the new listings report.
//!
//! ## Layout
//!
//! ```text
//! state/
//! ├── seen.json     # { "seen": [...], "updated_at": ... }  grows monotonically
//! ├── new.json      # { "newCars": [...], "generated_at": ... }  rewritten every run
//! └── .lock         # held while a run reads and commits state
//! ```

pub mod local;
pub mod lock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::NewReport;
use crate::pipeline::SeenSet;

// Re-export for convenience
pub use local::LocalStateStore;
pub use lock::StateLock;

/// Metadata about a committed run.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Size of the persisted seen set
    pub seen_count: usize,
    /// Entries in the persisted report
    pub new_count: usize,
}

/// Trait for seen-set storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Take exclusive ownership of the state until the guard drops.
    async fn lock(&self) -> Result<StateLock>;

    /// Load the seen set of earlier runs.
    ///
    /// Missing, unreadable or malformed state yields an empty set.
    async fn load_seen(&self) -> SeenSet;

    /// Persist the updated seen set and this run's report together.
    async fn commit(&self, seen: &SeenSet, report: &NewReport) -> Result<WriteMetadata>;
}
