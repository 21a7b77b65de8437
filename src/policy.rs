//! Declarative acceptance policy and MIME helpers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::{FileCandidate, ValidationError};

/// A size limit in explicit units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSize {
    Bytes(u64),
    Kib(u64),
    Mib(u64),
    Gib(u64),
}

impl FileSize {
    pub fn as_bytes(self) -> u64 {
        match self {
            FileSize::Bytes(n) => n,
            FileSize::Kib(n) => n.saturating_mul(1024),
            FileSize::Mib(n) => n.saturating_mul(1024 * 1024),
            FileSize::Gib(n) => n.saturating_mul(1024 * 1024 * 1024),
        }
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        FileSize::Bytes(bytes)
    }
}

/// Batch-level custom check. Runs once per validation pass; its errors are
/// appended after the built-in ones.
pub type Validator = Arc<dyn Fn(&[FileCandidate]) -> Vec<ValidationError> + Send + Sync>;

/// The declarative acceptance rules evaluated by [`crate::validate::validate`].
#[derive(Clone)]
pub struct Policy {
    /// MIME patterns, exact (`image/png`) or wildcard (`image/*`).
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size: Option<FileSize>,
    pub max_file_count: Option<usize>,
    pub reject_duplicate_files: bool,
    /// When false, single-select: only the first candidate of a batch is
    /// considered and a successful add replaces the tracked list.
    pub multiple: bool,
    pub disable_preview_for_non_image_files: bool,
    pub validator: Option<Validator>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_file_types: None,
            max_file_size: None,
            max_file_count: None,
            reject_duplicate_files: false,
            multiple: true,
            disable_preview_for_non_image_files: false,
            validator: None,
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("allowed_file_types", &self.allowed_file_types)
            .field("max_file_size", &self.max_file_size)
            .field("max_file_count", &self.max_file_count)
            .field("reject_duplicate_files", &self.reject_duplicate_files)
            .field("multiple", &self.multiple)
            .field(
                "disable_preview_for_non_image_files",
                &self.disable_preview_for_non_image_files,
            )
            .field("validator", &self.validator.as_ref().map(|_| "fn"))
            .finish()
    }
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_file_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_file_size(mut self, size: impl Into<FileSize>) -> Self {
        self.max_file_size = Some(size.into());
        self
    }

    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = Some(count);
        self
    }

    pub fn with_reject_duplicate_files(mut self, reject: bool) -> Self {
        self.reject_duplicate_files = reject;
        self
    }

    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn with_disable_preview_for_non_image_files(mut self, disable: bool) -> Self {
        self.disable_preview_for_non_image_files = disable;
        self
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&[FileCandidate]) -> Vec<ValidationError> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }
}

/// Match a MIME type against a policy pattern, exact or `type/*` wildcard.
pub fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/*") {
        mime_type
            .split('/')
            .next()
            .is_some_and(|top| top.eq_ignore_ascii_case(prefix))
    } else {
        pattern.eq_ignore_ascii_case(mime_type)
    }
}

/// Guess MIME type from filename extension.
pub fn guess_mime_type(filename: &str) -> String {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
    .to_string()
}
