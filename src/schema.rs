//! Core data model for the intake engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preview::PreviewHandle;

/// A raw file selection from a drop or picker interaction, not yet tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    data: Arc<[u8]>,
}

impl FileCandidate {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            mime_type: mime_type.into(),
            last_modified: None,
            data,
        }
    }

    /// Build a candidate guessing the MIME type from the file extension,
    /// for adapters whose native events carry no type information.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let mime_type = crate::policy::guess_mime_type(&name);
        Self::new(name, mime_type, data)
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    /// Binary content accessor.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Duplicate identity: name + size + modification time.
    pub fn same_file_as(&self, other: &FileCandidate) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.last_modified == other.last_modified
    }
}

/// Metadata for a file uploaded elsewhere and pre-seeded into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub url: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            url: None,
            last_modified: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }
}

/// Where a tracked file's bytes live: selected locally, or already remote.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Local(FileCandidate),
    Remote(FileMeta),
}

/// A tracked file: stable id, source, preview handle, upload progress.
#[derive(Debug, Clone, PartialEq)]
pub struct FileState {
    pub id: String,
    pub source: FileSource,
    pub preview: Option<PreviewHandle>,
    /// Percent complete, absent until the uploader first reports.
    pub progress: Option<u8>,
}

impl FileState {
    pub fn local(id: impl Into<String>, candidate: FileCandidate, preview: Option<PreviewHandle>) -> Self {
        Self {
            id: id.into(),
            source: FileSource::Local(candidate),
            preview,
            progress: None,
        }
    }

    /// Pre-seeded remote entry. Its preview, if any, wraps the caller's url
    /// and is never locally owned.
    pub fn remote(id: impl Into<String>, meta: FileMeta) -> Self {
        let preview = meta.url.clone().map(PreviewHandle::external);
        Self {
            id: id.into(),
            source: FileSource::Remote(meta),
            preview,
            progress: None,
        }
    }

    pub fn name(&self) -> &str {
        match &self.source {
            FileSource::Local(c) => &c.name,
            FileSource::Remote(m) => &m.name,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.source {
            FileSource::Local(c) => c.size,
            FileSource::Remote(m) => m.size,
        }
    }

    pub fn mime_type(&self) -> &str {
        match &self.source {
            FileSource::Local(c) => &c.mime_type,
            FileSource::Remote(m) => &m.mime_type,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, FileSource::Local(_))
    }

    /// Duplicate identity against an incoming candidate.
    pub fn matches_candidate(&self, candidate: &FileCandidate) -> bool {
        let last_modified = match &self.source {
            FileSource::Local(c) => c.last_modified,
            FileSource::Remote(m) => m.last_modified,
        };
        self.name() == candidate.name
            && self.size() == candidate.size
            && last_modified == candidate.last_modified
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationErrorKind {
    InvalidType,
    TooLarge,
    Duplicate,
    LimitExceeded,
    Custom,
}

impl ValidationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationErrorKind::InvalidType => "invalid-type",
            ValidationErrorKind::TooLarge => "too-large",
            ValidationErrorKind::Duplicate => "duplicate",
            ValidationErrorKind::LimitExceeded => "limit-exceeded",
            ValidationErrorKind::Custom => "custom",
        }
    }
}

/// A structured rejection for one candidate. Validation failures are data,
/// never panics or `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub file: FileCandidate,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(file: FileCandidate, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            file,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Committed store snapshot handed to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub files: Vec<FileState>,
    pub errors: Vec<ValidationError>,
    pub is_dragging_over: bool,
}
