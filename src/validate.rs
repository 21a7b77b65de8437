//! Pure policy evaluation for candidate batches.
//!
//! No side effects: candidates + currently tracked files + policy in,
//! accepted candidates + structured errors out. Any notification is the
//! caller's responsibility.

use crate::policy::{mime_matches, Policy};
use crate::schema::{FileCandidate, FileState, ValidationError, ValidationErrorKind};

/// Outcome of one validation pass. Both lists preserve candidate input order.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    pub valid_files: Vec<FileCandidate>,
    pub errors: Vec<ValidationError>,
}

/// Evaluate a candidate batch against the policy and the tracked list.
///
/// Per candidate the first failing check wins: type, then size, then
/// duplicate, then count. In single-select mode only the first candidate is
/// considered; the rest are ignored, not errored. A custom validator runs
/// once per batch afterwards and may add rejections but cannot re-accept a
/// built-in one.
pub fn validate(candidates: &[FileCandidate], existing: &[FileState], policy: &Policy) -> Validated {
    let considered = if policy.multiple {
        candidates
    } else {
        &candidates[..candidates.len().min(1)]
    };

    let mut valid_files: Vec<FileCandidate> = Vec::new();
    let mut errors: Vec<ValidationError> = Vec::new();

    for candidate in considered {
        match check_candidate(candidate, existing, &valid_files, policy) {
            Some(error) => errors.push(error),
            None => valid_files.push(candidate.clone()),
        }
    }

    if let Some(validator) = &policy.validator {
        for error in validator(considered) {
            valid_files.retain(|c| !(c.name == error.file.name && c.size == error.file.size));
            errors.push(error);
        }
    }

    Validated { valid_files, errors }
}

fn check_candidate(
    candidate: &FileCandidate,
    existing: &[FileState],
    accepted: &[FileCandidate],
    policy: &Policy,
) -> Option<ValidationError> {
    if let Some(types) = &policy.allowed_file_types {
        if !types.iter().any(|p| mime_matches(p, &candidate.mime_type)) {
            return Some(ValidationError::new(
                candidate.clone(),
                ValidationErrorKind::InvalidType,
                format!("file type {} is not allowed", candidate.mime_type),
            ));
        }
    }

    if let Some(max) = policy.max_file_size {
        if candidate.size > max.as_bytes() {
            return Some(ValidationError::new(
                candidate.clone(),
                ValidationErrorKind::TooLarge,
                format!(
                    "{} is {} bytes, over the {} byte limit",
                    candidate.name,
                    candidate.size,
                    max.as_bytes()
                ),
            ));
        }
    }

    if policy.reject_duplicate_files {
        let duplicate = existing.iter().any(|fs| fs.matches_candidate(candidate))
            || accepted.iter().any(|c| c.same_file_as(candidate));
        if duplicate {
            return Some(ValidationError::new(
                candidate.clone(),
                ValidationErrorKind::Duplicate,
                format!("{} is already tracked", candidate.name),
            ));
        }
    }

    if let Some(max) = policy.max_file_count {
        if existing.len() + accepted.len() + 1 > max {
            return Some(ValidationError::new(
                candidate.clone(),
                ValidationErrorKind::LimitExceeded,
                format!("file count limit of {max} reached"),
            ));
        }
    }

    None
}
