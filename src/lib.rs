//! filedrop — policy-driven file intake and upload orchestration.
//!
//! Accepts raw file selections from drag-and-drop or picker events,
//! validates them against a declarative [`Policy`], tracks each accepted
//! file's lifecycle (id, preview handle, upload progress), coordinates
//! asynchronous uploads through an injected [`Uploader`], and exposes a
//! subscribable [`StoreState`] snapshot to presentation layers.

pub mod events;
pub mod policy;
pub mod preview;
pub mod schema;
pub mod store;
pub mod upload;
pub mod validate;

pub use events::{DragEvent, InputChangeEvent};
pub use policy::{guess_mime_type, mime_matches, FileSize, Policy, Validator};
pub use preview::{PreviewHandle, PreviewManager};
pub use schema::{
    FileCandidate, FileMeta, FileSource, FileState, StoreState, ValidationError,
    ValidationErrorKind,
};
pub use store::{FileStore, StoreCallbacks, StoreConfig, SubscriptionId};
pub use upload::{ProgressSink, UploadError, Uploader};
pub use validate::{validate, Validated};
