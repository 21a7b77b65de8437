//! Upload orchestration contract.
//!
//! The store hands each newly accepted batch to an [`Uploader`] together
//! with a [`ProgressSink`]. The uploader owns the wire protocol, timeouts,
//! and any cancellation; the store only cares about state convergence.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::FileState;
use crate::store::FileStore;

/// Why a single file's transfer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum UploadError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rejected by remote endpoint: {0}")]
    Rejected(String),
    #[error("upload failed: {0}")]
    Other(String),
}

/// Transfers accepted batches.
///
/// Per-file outcomes go through the sink: progress in `0..=100`, then
/// terminal [`ProgressSink::success`] or [`ProgressSink::error`]. One file's
/// failure must not abort the rest of the batch; the returned result covers
/// batch-level breakage only (logged by the store, never surfaced as
/// validation errors). The store does not retry.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, batch: Vec<FileState>, sink: ProgressSink) -> Result<()>;
}

/// Per-file reporting surface handed to the uploader. Cloneable; clones
/// share the same error collection.
///
/// Every report is keyed by file id. An id no longer tracked (removed
/// mid-upload, or superseded by a later single-select add) is a silent
/// no-op: never an error, never re-inserted.
#[derive(Clone)]
pub struct ProgressSink {
    store: FileStore,
    collected: Arc<Mutex<Vec<UploadError>>>,
}

impl ProgressSink {
    pub(crate) fn new(store: FileStore) -> Self {
        Self {
            store,
            collected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report percent complete, clamped to 100.
    pub fn progress(&self, id: &str, pct: u8) {
        self.store.apply_progress(id, pct);
    }

    /// Report terminal success; pins progress to 100.
    pub fn success(&self, id: &str) {
        self.store.apply_success(id);
    }

    /// Report a per-file failure. Collected errors are delivered once the
    /// batch settles.
    pub fn error(&self, id: &str, error: UploadError) {
        if self.store.apply_error(id, &error) {
            self.collected.lock().push(error);
        }
    }

    pub(crate) fn take_collected(&self) -> Vec<UploadError> {
        std::mem::take(&mut *self.collected.lock())
    }
}
