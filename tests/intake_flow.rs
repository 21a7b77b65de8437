//! End-to-end intake flows: policy validation, upload progress and results,
//! and convergence when uploads race against removal or replacement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use filedrop::{
    FileCandidate, FileSize, FileState, FileStore, Policy, ProgressSink, StoreConfig, UploadError,
    Uploader, ValidationErrorKind,
};

fn png(name: &str, size: usize) -> FileCandidate {
    FileCandidate::new(name, "image/png", vec![0u8; size])
}

/// Reports staged progress then a terminal outcome for every file in the
/// batch, inline, then signals the test that the batch body has run.
struct ScriptedUploader {
    done: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload(&self, batch: Vec<FileState>, sink: ProgressSink) -> anyhow::Result<()> {
        for file in &batch {
            sink.progress(&file.id, 30);
            sink.progress(&file.id, 60);
            if file.name().contains("bad") {
                sink.error(&file.id, UploadError::Rejected(format!("{} refused", file.name())));
            } else {
                sink.success(&file.id);
            }
        }
        let _ = self.done.send(());
        Ok(())
    }
}

/// Parks each batch with its sink on a channel so the test controls when
/// (and whether) reports happen.
struct ParkedUploader {
    handoff: mpsc::UnboundedSender<(Vec<FileState>, ProgressSink)>,
}

#[async_trait]
impl Uploader for ParkedUploader {
    async fn upload(&self, batch: Vec<FileState>, sink: ProgressSink) -> anyhow::Result<()> {
        let _ = self.handoff.send((batch, sink));
        Ok(())
    }
}

#[tokio::test]
async fn accepted_batch_reaches_terminal_success() {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let successes = Arc::new(Mutex::new(Vec::<String>::new()));
    let success_sink = successes.clone();
    let uploaded_batches = Arc::new(AtomicUsize::new(0));
    let batches = uploaded_batches.clone();

    let store = FileStore::new(
        StoreConfig::new(
            Policy::new()
                .with_allowed_file_types(["image/png"])
                .with_max_file_size(FileSize::Bytes(1_000_000))
                .with_max_file_count(2),
        )
        .with_uploader(Arc::new(ScriptedUploader { done: done_tx }))
        .on_upload(move |batch| {
            batches.fetch_add(batch.len(), Ordering::Relaxed);
        })
        .on_upload_success(move |file| {
            success_sink.lock().push(file.name().to_string());
        }),
    );

    store.add_files(vec![
        png("a.png", 500_000),
        FileCandidate::new("b.pdf", "application/pdf", vec![0u8; 200_000]),
        png("c.png", 2_000_000),
    ]);

    // Committed synchronously: one accepted, two structured rejections.
    let state = store.state();
    assert_eq!(state.files.len(), 1);
    assert_eq!(state.files[0].name(), "a.png");
    assert_eq!(state.errors.len(), 2);
    assert_eq!(state.errors[0].file.name, "b.pdf");
    assert_eq!(state.errors[0].kind, ValidationErrorKind::InvalidType);
    assert_eq!(state.errors[1].file.name, "c.png");
    assert_eq!(state.errors[1].kind, ValidationErrorKind::TooLarge);

    done_rx.recv().await.expect("upload task ran");
    assert_eq!(store.files()[0].progress, Some(100));
    assert_eq!(*successes.lock(), vec!["a.png".to_string()]);
    assert_eq!(uploaded_batches.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn per_file_errors_are_collected_once_the_batch_settles() {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let (coll_tx, mut coll_rx) = mpsc::unbounded_channel();
    let per_file = Arc::new(AtomicUsize::new(0));
    let per_file_counter = per_file.clone();

    let store = FileStore::new(
        StoreConfig::new(Policy::new())
            .with_uploader(Arc::new(ScriptedUploader { done: done_tx }))
            .on_upload_error(move |_, _| {
                per_file_counter.fetch_add(1, Ordering::Relaxed);
            })
            .on_upload_error_collection(move |errors| {
                let _ = coll_tx.send(errors.to_vec());
            }),
    );

    store.add_files(vec![png("good.png", 10), png("bad.png", 10)]);
    done_rx.recv().await.expect("upload task ran");
    let collected = coll_rx.recv().await.expect("collection delivered");

    assert_eq!(collected.len(), 1);
    assert!(matches!(collected[0], UploadError::Rejected(_)));
    assert_eq!(per_file.load(Ordering::Relaxed), 1);

    // Upload failures never leak into the validation error list.
    assert!(store.state().errors.is_empty());
    let files = store.files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].progress, Some(100));
}

#[tokio::test]
async fn late_callbacks_from_a_superseded_batch_are_noops() {
    let (handoff_tx, mut handoff_rx) = mpsc::unbounded_channel();
    let store = FileStore::new(
        StoreConfig::new(Policy::new().with_multiple(false))
            .with_uploader(Arc::new(ParkedUploader { handoff: handoff_tx })),
    );

    store.add_files(vec![png("first.png", 10)]);
    let (batch1, sink1) = handoff_rx.recv().await.expect("first batch parked");

    store.add_files(vec![png("second.png", 10)]);
    let (batch2, sink2) = handoff_rx.recv().await.expect("second batch parked");

    // Replacement already won in visible state.
    let files = store.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name(), "second.png");

    // The superseded batch keeps running; its reports target a vanished id.
    sink1.progress(&batch1[0].id, 55);
    sink1.success(&batch1[0].id);
    let files = store.files();
    assert_eq!(files[0].name(), "second.png");
    assert_eq!(files[0].progress, None);

    sink2.progress(&batch2[0].id, 40);
    assert_eq!(store.files()[0].progress, Some(40));
}

#[tokio::test]
async fn removal_mid_upload_converges_without_side_effects() {
    let (handoff_tx, mut handoff_rx) = mpsc::unbounded_channel();
    let successes = Arc::new(AtomicUsize::new(0));
    let success_counter = successes.clone();

    let store = FileStore::new(
        StoreConfig::new(Policy::new())
            .with_uploader(Arc::new(ParkedUploader { handoff: handoff_tx }))
            .on_upload_success(move |_| {
                success_counter.fetch_add(1, Ordering::Relaxed);
            }),
    );

    store.add_files(vec![png("a.png", 10)]);
    let (batch, sink) = handoff_rx.recv().await.expect("batch parked");
    assert_eq!(store.preview_manager().active_handles(), 1);

    store.remove_file(&batch[0].id);
    assert!(store.files().is_empty());
    assert_eq!(store.preview_manager().active_handles(), 0);

    // The transfer "finishes" anyway; nothing is re-inserted or fired.
    sink.progress(&batch[0].id, 90);
    sink.success(&batch[0].id);
    sink.error(&batch[0].id, UploadError::Other("late".into()));
    assert!(store.files().is_empty());
    assert_eq!(successes.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn only_newly_accepted_files_are_uploaded() {
    let (handoff_tx, mut handoff_rx) = mpsc::unbounded_channel();
    let store = FileStore::new(
        StoreConfig::new(Policy::new())
            .with_uploader(Arc::new(ParkedUploader { handoff: handoff_tx })),
    );

    store.add_files(vec![png("a.png", 10)]);
    let (batch1, _sink1) = handoff_rx.recv().await.expect("first batch");
    assert_eq!(batch1.len(), 1);

    store.add_files(vec![png("b.png", 10), png("c.png", 10)]);
    let (batch2, _sink2) = handoff_rx.recv().await.expect("second batch");
    let names: Vec<_> = batch2.iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names, vec!["b.png", "c.png"]);
    assert_eq!(store.files().len(), 3);
}

#[tokio::test]
async fn fully_rejected_batch_never_reaches_the_uploader() {
    let (handoff_tx, mut handoff_rx) = mpsc::unbounded_channel();
    let store = FileStore::new(
        StoreConfig::new(Policy::new().with_allowed_file_types(["image/*"]))
            .with_uploader(Arc::new(ParkedUploader { handoff: handoff_tx })),
    );

    store.add_files(vec![FileCandidate::new(
        "notes.txt",
        "text/plain",
        vec![0u8; 10],
    )]);
    assert_eq!(store.state().errors.len(), 1);

    // Yield so a (wrongly) spawned upload task would have run by now.
    tokio::task::yield_now().await;
    assert!(handoff_rx.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_rejection_tracks_nothing_new() {
    let (done_tx, _done_rx) = mpsc::unbounded_channel();
    let store = FileStore::new(
        StoreConfig::new(Policy::new().with_reject_duplicate_files(true))
            .with_uploader(Arc::new(ScriptedUploader { done: done_tx })),
    );

    store.add_files(vec![png("a.png", 64)]);
    let before = store.files();
    store.add_files(vec![png("a.png", 64)]);

    let state = store.state();
    assert_eq!(state.files.len(), 1);
    assert_eq!(state.files[0].id, before[0].id);
    assert_eq!(state.errors.len(), 1);
    assert_eq!(state.errors[0].kind, ValidationErrorKind::Duplicate);
}
