//! Signals shared across stages.
//!
//! `Trigger` is written by classification and consumed by acquisition.
//! `StopSignal` asks acquisition to finish its current segment and shut the
//! pipeline down.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// "Keep the current segment" flag.
///
/// `take()` is an atomic swap, so every raise is observed by exactly one
/// segment decision: the one in progress, or the next one.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    flag: Arc<AtomicBool>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the current segment for retention.
    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Peek without consuming.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Read and clear in one step.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// Cooperative stop request.
///
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    marker: Option<PathBuf>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stop signal that is also raised by the presence of `marker`.
    pub fn with_marker(marker: impl Into<PathBuf>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            marker: Some(marker.into()),
        }
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        match &self.marker {
            Some(path) if path.exists() => {
                log::info!("Stop marker found at {}", path.display());
                self.flag.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    /// Remove a stale marker left by a previous run.
    pub fn clear_marker(&self) -> std::io::Result<()> {
        match &self.marker {
            Some(path) if path.exists() => std::fs::remove_file(path),
            _ => Ok(()),
        }
    }
}
