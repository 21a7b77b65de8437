//! Thin adapter boundary between native-event shapes and store actions.
//!
//! These types stand in for the host's pointer/drag/input events: they carry
//! the candidate files and record default-behavior suppression so the store
//! handlers can keep the browser-navigation contract observable.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::schema::FileCandidate;

/// A drag interaction over the drop zone.
#[derive(Debug, Default)]
pub struct DragEvent {
    files: Mutex<Vec<FileCandidate>>,
    default_prevented: AtomicBool,
}

impl DragEvent {
    pub fn new(files: Vec<FileCandidate>) -> Self {
        Self {
            files: Mutex::new(files),
            default_prevented: AtomicBool::new(false),
        }
    }

    /// Enter/over/leave events carry no useful file list.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::Relaxed);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Relaxed)
    }

    /// Hand the dropped candidates over, once.
    pub fn take_files(&self) -> Vec<FileCandidate> {
        std::mem::take(&mut *self.files.lock())
    }
}

/// A file-input change: the picker's selection plus the input's value, which
/// the adapter resets after forwarding so the same path can be re-selected.
#[derive(Debug)]
pub struct InputChangeEvent {
    files: Mutex<Vec<FileCandidate>>,
    value: Mutex<String>,
}

impl InputChangeEvent {
    pub fn new(files: Vec<FileCandidate>, value: impl Into<String>) -> Self {
        Self {
            files: Mutex::new(files),
            value: Mutex::new(value.into()),
        }
    }

    pub fn take_files(&self) -> Vec<FileCandidate> {
        std::mem::take(&mut *self.files.lock())
    }

    pub fn reset_value(&self) {
        self.value.lock().clear();
    }

    pub fn value(&self) -> String {
        self.value.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_event_records_suppression() {
        let event = DragEvent::empty();
        assert!(!event.default_prevented());
        event.prevent_default();
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn files_are_taken_once() {
        let event = DragEvent::new(vec![FileCandidate::new("a.txt", "text/plain", vec![1u8])]);
        assert_eq!(event.take_files().len(), 1);
        assert!(event.take_files().is_empty());
    }

    #[test]
    fn input_value_resets() {
        let event = InputChangeEvent::new(Vec::new(), "C:\\fakepath\\a.txt");
        assert_eq!(event.value(), "C:\\fakepath\\a.txt");
        event.reset_value();
        assert_eq!(event.value(), "");
    }
}
