//! The stateful intake core.
//!
//! One [`FileStore`] per drop zone, explicitly constructed and passed by
//! reference (or cheap clone) to its consumers; no process-wide singleton.
//! Synchronous mutations run to completion under the state lock and commit
//! before listeners are notified; uploads interleave only at the spawn
//! boundary and at each sink callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::{DragEvent, InputChangeEvent};
use crate::policy::Policy;
use crate::preview::PreviewManager;
use crate::schema::{FileCandidate, FileMeta, FileState, StoreState};
use crate::upload::{ProgressSink, UploadError, Uploader};
use crate::validate::validate;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type SliceCallback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Collaborator callbacks. All optional, all side-effect only; none affect
/// engine control flow.
#[derive(Clone, Default)]
pub struct StoreCallbacks {
    /// Fired with each newly accepted batch as its upload begins.
    pub on_upload: Option<SliceCallback<FileState>>,
    /// Fired per file when the uploader reports a failure.
    pub on_upload_error: Option<Arc<dyn Fn(&FileState, &UploadError) + Send + Sync>>,
    /// Fired once per settled batch with every collected per-file error.
    pub on_upload_error_collection: Option<SliceCallback<UploadError>>,
    /// Fired per file when the uploader reports terminal success.
    pub on_upload_success: Option<Callback<FileState>>,
    /// Fired with the tracked list after every change to it, including
    /// progress-only changes.
    pub on_files_change: Option<SliceCallback<FileState>>,
}

/// Construction-time configuration for a [`FileStore`].
#[derive(Clone, Default)]
pub struct StoreConfig {
    pub policy: Policy,
    /// A disabled store ignores drops (picker adapters are expected to be
    /// disabled at their own layer).
    pub disabled: bool,
    /// Files uploaded elsewhere, tracked from the start as `Remote` entries.
    pub initial_files: Vec<FileMeta>,
    pub callbacks: StoreCallbacks,
    pub uploader: Option<Arc<dyn Uploader>>,
}

impl StoreConfig {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_initial_files(mut self, files: Vec<FileMeta>) -> Self {
        self.initial_files = files;
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn on_upload(mut self, f: impl Fn(&[FileState]) + Send + Sync + 'static) -> Self {
        self.callbacks.on_upload = Some(Arc::new(f));
        self
    }

    pub fn on_upload_error(
        mut self,
        f: impl Fn(&FileState, &UploadError) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_upload_error = Some(Arc::new(f));
        self
    }

    pub fn on_upload_error_collection(
        mut self,
        f: impl Fn(&[UploadError]) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_upload_error_collection = Some(Arc::new(f));
        self
    }

    pub fn on_upload_success(mut self, f: impl Fn(&FileState) + Send + Sync + 'static) -> Self {
        self.callbacks.on_upload_success = Some(Arc::new(f));
        self
    }

    pub fn on_files_change(mut self, f: impl Fn(&[FileState]) + Send + Sync + 'static) -> Self {
        self.callbacks.on_files_change = Some(Arc::new(f));
        self
    }
}

/// Handle returned by [`FileStore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&StoreState) + Send + Sync>;

/// The stateful core: tracked files, validation errors, drag-over flag.
///
/// Cheap to clone; clones share state. Actions never panic or return `Err`
/// under normal operation — failures are data or callbacks.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<StoreState>,
    previews: PreviewManager,
    policy: Policy,
    disabled: bool,
    callbacks: StoreCallbacks,
    uploader: Option<Arc<dyn Uploader>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl FileStore {
    pub fn new(config: StoreConfig) -> Self {
        let files = config
            .initial_files
            .into_iter()
            .map(|meta| {
                let id = new_id(&meta.name);
                FileState::remote(id, meta)
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState {
                    files,
                    errors: Vec::new(),
                    is_dragging_over: false,
                }),
                previews: PreviewManager::new(),
                policy: config.policy,
                disabled: config.disabled,
                callbacks: config.callbacks,
                uploader: config.uploader,
                listeners: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
        }
    }

    /// Validate a raw selection and track the accepted files.
    ///
    /// Empty input is logged and ignored. A batch with both accepted and
    /// rejected candidates is a partial success: accepted files are tracked
    /// and uploaded, rejections land in `errors`. In single-select mode a
    /// successful batch replaces the tracked list. The upload itself runs on
    /// a spawned task; this call returns once the new state is committed.
    pub fn add_files(&self, candidates: Vec<FileCandidate>) {
        if candidates.is_empty() {
            debug!("add_files called with no candidates, ignoring");
            return;
        }

        let (new_states, snapshot) = {
            let mut state = self.inner.state.lock();
            let outcome = validate(&candidates, &state.files, &self.inner.policy);

            if outcome.valid_files.is_empty() {
                state.errors = outcome.errors;
                state.is_dragging_over = false;
                let snapshot = state.clone();
                drop(state);
                self.notify(&snapshot, false);
                return;
            }

            let mut new_states = Vec::with_capacity(outcome.valid_files.len());
            for candidate in outcome.valid_files {
                let preview = self.inner.previews.create_preview(
                    &candidate,
                    self.inner.policy.disable_preview_for_non_image_files,
                );
                new_states.push(FileState::local(new_id(&candidate.name), candidate, preview));
            }

            if self.inner.policy.multiple {
                state.files.extend(new_states.iter().cloned());
            } else {
                // Replacement destroys the previous entries; their previews
                // must be released here, the only place that sees them go.
                for old in &state.files {
                    self.inner.previews.release(old);
                }
                state.files = new_states.clone();
            }
            state.errors = outcome.errors;
            state.is_dragging_over = false;
            (new_states, state.clone())
        };

        self.notify(&snapshot, true);
        self.begin_upload(new_states);
    }

    /// Remove a tracked file by id. Unknown ids are ignored. Clears the
    /// error list: stale errors are discarded on any successful remove.
    pub fn remove_file(&self, id: &str) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(pos) = state.files.iter().position(|f| f.id == id) else {
                debug!(%id, "remove_file for untracked id, ignoring");
                return;
            };
            let removed = state.files.remove(pos);
            self.inner.previews.release(&removed);
            state.errors.clear();
            state.clone()
        };
        self.notify(&snapshot, true);
    }

    pub fn remove_file_state(&self, file: &FileState) {
        self.remove_file(&file.id);
    }

    /// Release every preview and drop all tracked files and errors.
    pub fn clear_files(&self) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            for file in &state.files {
                self.inner.previews.release(file);
            }
            state.files.clear();
            state.errors.clear();
            state.clone()
        };
        self.notify(&snapshot, true);
    }

    /// Empty the error list; tracked files are untouched.
    pub fn clear_errors(&self) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            state.errors.clear();
            state.clone()
        };
        self.notify(&snapshot, false);
    }

    pub fn handle_drag_enter(&self, event: &DragEvent) {
        event.prevent_default();
        self.set_dragging(true);
    }

    pub fn handle_drag_over(&self, event: &DragEvent) {
        event.prevent_default();
    }

    /// Clears the drag flag unconditionally. Known limitation: nested child
    /// drag regions can flicker because there is no enter/leave depth
    /// counter; pending product-owner confirmation this stays as is.
    pub fn handle_drag_leave(&self, _event: &DragEvent) {
        self.set_dragging(false);
    }

    pub fn handle_drop(&self, event: &DragEvent) {
        event.prevent_default();
        if self.inner.disabled {
            debug!("drop on disabled store, ignoring");
            return;
        }
        self.add_files(event.take_files());
    }

    /// Picker adapter: forward the selection, then reset the input value so
    /// re-selecting the same path fires a change event again.
    pub fn handle_input_change(&self, event: &InputChangeEvent) {
        self.add_files(event.take_files());
        event.reset_value();
    }

    /// Register a listener invoked synchronously with the committed snapshot
    /// after every mutation.
    pub fn subscribe(&self, listener: impl Fn(&StoreState) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.listeners.lock().retain(|(sid, _)| *sid != id);
    }

    /// Current committed snapshot.
    pub fn state(&self) -> StoreState {
        self.inner.state.lock().clone()
    }

    /// Current tracked files.
    pub fn files(&self) -> Vec<FileState> {
        self.inner.state.lock().files.clone()
    }

    /// The preview registry, exposed so integrators can assert leak-freedom.
    pub fn preview_manager(&self) -> &PreviewManager {
        &self.inner.previews
    }

    pub(crate) fn apply_progress(&self, id: &str, pct: u8) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(file) = state.files.iter_mut().find(|f| f.id == id) else {
                debug!(%id, "progress for untracked id, ignoring");
                return;
            };
            file.progress = Some(pct.min(100));
            state.clone()
        };
        self.notify(&snapshot, true);
    }

    pub(crate) fn apply_success(&self, id: &str) {
        let (snapshot, file) = {
            let mut state = self.inner.state.lock();
            let Some(file) = state.files.iter_mut().find(|f| f.id == id) else {
                debug!(%id, "success for untracked id, ignoring");
                return;
            };
            file.progress = Some(100);
            let file = file.clone();
            (state.clone(), file)
        };
        self.notify(&snapshot, true);
        if let Some(cb) = &self.inner.callbacks.on_upload_success {
            cb(&file);
        }
    }

    /// Returns whether the id was still tracked (and the error delivered).
    pub(crate) fn apply_error(&self, id: &str, error: &UploadError) -> bool {
        let file = {
            let state = self.inner.state.lock();
            match state.files.iter().find(|f| f.id == id) {
                Some(file) => file.clone(),
                None => {
                    debug!(%id, "upload error for untracked id, ignoring");
                    return false;
                }
            }
        };
        if let Some(cb) = &self.inner.callbacks.on_upload_error {
            cb(&file, error);
        }
        true
    }

    fn set_dragging(&self, value: bool) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            state.is_dragging_over = value;
            state.clone()
        };
        self.notify(&snapshot, false);
    }

    /// Deliver a committed snapshot to listeners, outside every lock so a
    /// listener may call back into the store.
    fn notify(&self, snapshot: &StoreState, files_changed: bool) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
        if files_changed {
            if let Some(cb) = &self.inner.callbacks.on_files_change {
                cb(&snapshot.files);
            }
        }
    }

    /// Hand the newly accepted batch to the uploader on a spawned task.
    /// The task is awaited by nobody; late sink callbacks from a superseded
    /// batch no-op against ids no longer tracked.
    fn begin_upload(&self, batch: Vec<FileState>) {
        let Some(uploader) = self.inner.uploader.clone() else {
            return;
        };
        if let Some(cb) = &self.inner.callbacks.on_upload {
            cb(&batch);
        }
        let store = self.clone();
        tokio::spawn(async move {
            let sink = ProgressSink::new(store.clone());
            if let Err(error) = uploader.upload(batch, sink.clone()).await {
                warn!(%error, "upload batch failed");
            }
            let collected = sink.take_collected();
            if !collected.is_empty() {
                if let Some(cb) = &store.inner.callbacks.on_upload_error_collection {
                    cb(&collected);
                }
            }
        });
    }
}

/// Stable unique id for a tracked file: sanitized name, nanosecond
/// timestamp, random suffix. Collision-safe across rapid repeated calls.
fn new_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{slug}-{nanos}-{}", &suffix[..8])
}
