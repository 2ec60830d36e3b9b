//! Local filesystem state store.
//!
//! Both documents are staged to `*.tmp` siblings and then renamed into place,
//! report first. A crash between the two renames leaves the old seen set
//! behind, so the next run reports those listings again instead of losing
//! them.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{NewReport, SeenState, StorageConfig};
use crate::pipeline::SeenSet;
use crate::storage::{StateLock, StateStore, WriteMetadata};

/// Filesystem-backed state store.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    state_path: PathBuf,
    report_path: PathBuf,
    lock_path: PathBuf,
    stale_lock: Duration,
}

impl LocalStateStore {
    /// Create a store at the configured locations.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            state_path: config.state_path.clone(),
            report_path: config.new_report_path.clone(),
            lock_path: config.lock_path.clone(),
            stale_lock: Duration::from_secs(config.stale_lock_secs),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Read the raw seen-set document, if any.
    pub async fn read_state(&self) -> Result<Option<SeenState>> {
        match read_bytes(&self.state_path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write JSON next to `path` and return the staged file.
    async fn stage_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<PathBuf> {
        ensure_dir(path).await?;

        let tmp = staging_path(path);
        let bytes = serde_json::to_vec_pretty(value)?;
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        Ok(tmp)
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn lock(&self) -> Result<StateLock> {
        let path = self.lock_path.clone();
        let stale_after = self.stale_lock;
        tokio::task::spawn_blocking(move || StateLock::acquire(&path, stale_after))
            .await
            .map_err(|e| AppError::Io(std::io::Error::other(e)))?
    }

    async fn load_seen(&self) -> SeenSet {
        match self.read_state().await {
            Ok(Some(state)) => {
                let seen: SeenSet = state.seen.into_iter().collect();
                log::debug!(
                    "Loaded {} seen URLs from {}",
                    seen.len(),
                    self.state_path.display()
                );
                seen
            }
            Ok(None) => {
                log::info!(
                    "No prior state at {}, treating every listing as new",
                    self.state_path.display()
                );
                SeenSet::new()
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable state at {}: {}",
                    self.state_path.display(),
                    e
                );
                SeenSet::new()
            }
        }
    }

    async fn commit(&self, seen: &SeenSet, report: &NewReport) -> Result<WriteMetadata> {
        let report_tmp = self.stage_json(&self.report_path, report).await?;

        let state = SeenState::new(seen.to_vec());
        let state_tmp = match self.stage_json(&self.state_path, &state).await {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = tokio::fs::remove_file(&report_tmp).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&report_tmp, &self.report_path).await?;
        tokio::fs::rename(&state_tmp, &self.state_path).await?;

        log::debug!(
            "Committed {} seen URLs to {} and {} new listings to {}",
            seen.len(),
            self.state_path.display(),
            report.new_cars.len(),
            self.report_path.display()
        );

        Ok(WriteMetadata {
            seen_count: seen.len(),
            new_count: report.new_cars.len(),
        })
    }
}

/// Read bytes, returning None if the file doesn't exist.
async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Ensure parent directory exists.
async fn ensure_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}
