//! Preview-resource lifecycle.
//!
//! Handles are revocable and exclusively owned by their tracked file; the
//! store is the only caller of [`PreviewManager::release`], on every
//! removal, clear, and single-select replacement path.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::schema::{FileCandidate, FileSource, FileState};

/// A preview resource attached to a tracked file.
///
/// Locally-created handles carry a registry id and are revoked on release.
/// External handles wrap a caller-supplied url (pre-seeded remote files) and
/// releasing them is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    pub url: String,
    owned: Option<Uuid>,
}

impl PreviewHandle {
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            owned: None,
        }
    }

    pub fn is_owned(&self) -> bool {
        self.owned.is_some()
    }
}

/// Creates and revokes locally-owned preview handles.
#[derive(Debug, Clone, Default)]
pub struct PreviewManager {
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt a preview for a local candidate.
    ///
    /// Returns `None` when `disable_for_non_image` is set and the candidate
    /// is not an image, or when no handle can be created from the content
    /// (empty payload). Creation never panics or errors.
    pub fn create_preview(
        &self,
        file: &FileCandidate,
        disable_for_non_image: bool,
    ) -> Option<PreviewHandle> {
        if disable_for_non_image && !file.is_image() {
            return None;
        }
        if file.bytes().is_empty() {
            return None;
        }
        let id = Uuid::new_v4();
        self.live.lock().insert(id);
        Some(PreviewHandle {
            url: format!("blob:{id}"),
            owned: Some(id),
        })
    }

    /// Revoke `state`'s handle if present and locally owned. Remote files
    /// never had one. Idempotent: a second release is a no-op.
    pub fn release(&self, state: &FileState) {
        if !matches!(state.source, FileSource::Local(_)) {
            return;
        }
        if let Some(handle) = &state.preview {
            self.release_handle(handle);
        }
    }

    pub fn release_handle(&self, handle: &PreviewHandle) {
        if let Some(id) = handle.owned {
            self.live.lock().remove(&id);
        }
    }

    /// Live locally-owned handle count.
    pub fn active_handles(&self) -> usize {
        self.live.lock().len()
    }
}
