//! Per-run state: working-file namespace, random seed and cancellation.

use crate::error::{ReelcutError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Signals cancellation to every context created from the same root.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Everything a single pipeline run owns.
///
/// Each run (and each variation within a run) gets its own working
/// directory and seed, so concurrent runs never share temp files.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub seed: u64,
    pub work_dir: PathBuf,
    pub keep_temp: bool,
    cancel: watch::Receiver<bool>,
}

impl RunContext {
    /// Create a fresh root context under `temp_dir`.
    pub fn new(temp_dir: &Path, seed: Option<u64>) -> (Self, CancelHandle) {
        let run_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let seed = seed.unwrap_or_else(rand::random);
        let (tx, rx) = watch::channel(false);

        let ctx = Self {
            work_dir: temp_dir.join(&run_id),
            run_id,
            seed,
            keep_temp: false,
            cancel: rx,
        };
        (ctx, CancelHandle { tx })
    }

    pub fn with_keep_temp(mut self, keep: bool) -> Self {
        self.keep_temp = keep;
        self
    }

    /// Derive an isolated child context for variation `index`.
    pub fn variation(&self, index: usize) -> Self {
        Self {
            run_id: format!("{}-v{}", self.run_id, index),
            seed: self.seed.wrapping_add(index as u64),
            work_dir: self.work_dir.join(format!("v{}", index)),
            keep_temp: self.keep_temp,
            cancel: self.cancel.clone(),
        }
    }

    /// Path of a working file inside this run's namespace.
    pub fn path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Fails with `Cancelled` once the run has been cancelled.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ReelcutError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Receiver for passing to long-running subprocess calls.
    pub fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.cancel.clone()
    }

    /// Remove the working directory unless temp files are kept.
    pub async fn cleanup(&self) {
        if self.keep_temp {
            tracing::debug!(dir = %self.work_dir.display(), "Keeping working directory");
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.work_dir.display(), "Failed to clean up: {}", e);
            }
        }
    }
}
