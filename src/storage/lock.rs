//! Exclusive run lock around the persisted state.
//!
//! The lock is a file created with `create_new`, so at most one run can hold
//! it. Each guard writes a unique token into the file and only removes the
//! file while it still carries that token.
//!
//! A lock file older than the configured age is treated as left behind by a
//! crashed run. It is taken over by renaming it aside first; only the run
//! whose rename moved the exact stale file it inspected may create the new
//! lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};

static GUARD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Guard holding the state lock until dropped.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    token: String,
}

impl StateLock {
    /// Take the lock at `path`, replacing it if older than `stale_after`.
    pub fn acquire(path: &Path, stale_after: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match Self::create(path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let observed = match fs::read_to_string(path) {
                    Ok(token) => token,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
                    Err(e) => return Err(e.into()),
                };
                if !Self::is_abandoned(path, stale_after) {
                    return Err(AppError::locked(path));
                }
                Self::take_over(path, &observed)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the stale lock aside and create a fresh one.
    ///
    /// `observed` is the content read when the lock was judged stale. If the
    /// file moved aside carries anything else, another run replaced it in the
    /// meantime and holds a live lock.
    fn take_over(path: &Path, observed: &str) -> Result<Self> {
        let aside = sibling(path, &format!("stale-{}", new_token()));
        match fs::rename(path, &aside) {
            Ok(()) => {}
            // Released or taken by someone else since we looked.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::create_or_locked(path),
            Err(e) => return Err(e.into()),
        }

        let moved = fs::read_to_string(&aside).unwrap_or_default();
        if moved != observed {
            // Put the live lock back unless its owner already re-created one.
            if let Err(e) = fs::hard_link(&aside, path) {
                log::warn!("Could not restore state lock {}: {}", path.display(), e);
            }
            let _ = fs::remove_file(&aside);
            return Err(AppError::locked(path));
        }

        log::warn!("Replacing stale state lock {}", path.display());
        let _ = fs::remove_file(&aside);
        Self::create_or_locked(path)
    }

    fn create_or_locked(path: &Path) -> Result<Self> {
        Self::create(path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => AppError::locked(path),
            _ => AppError::Io(e),
        })
    }

    fn create(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let token = new_token();
        if let Err(e) = writeln!(file, "{token}") {
            drop(file);
            let _ = fs::remove_file(path);
            return Err(e);
        }
        Ok(Self {
            path: path.to_path_buf(),
            token,
        })
    }

    /// Whether the file at `path` still carries this guard's token.
    fn owns_file(&self) -> bool {
        fs::read_to_string(&self.path).is_ok_and(|content| content.trim() == self.token)
    }

    /// A lock is abandoned when it is older than `stale_after` or has
    /// disappeared since the failed create.
    fn is_abandoned(path: &Path, stale_after: Duration) -> bool {
        match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified.elapsed().is_ok_and(|age| age > stale_after),
            Err(e) => e.kind() == io::ErrorKind::NotFound,
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.owns_file() {
            log::warn!(
                "State lock {} was taken over; leaving it in place",
                self.path.display()
            );
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release state lock {}: {}", self.path.display(), e);
        }
    }
}

/// `<pid>-<nanos>-<seq>`, unique across processes and guards.
fn new_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = GUARD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", std::process::id(), nanos, seq)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
