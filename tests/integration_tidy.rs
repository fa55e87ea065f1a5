//! Integration tests for tidy runs.
//!
//! These tests verify end-to-end tidy behavior including:
//! - Scan, group and move of a duplicate
//! - Target containment and unique naming
//! - Dry runs leaving no trace
//! - Ledger rows surviving an interrupted run
//! - Cross-device moves and failed path updates

use assert_fs::prelude::*;
use photo_tidy::core::metadata::NoMetadata;
use photo_tidy::core::scanner::{ScanOptions, Scanner};
use photo_tidy::core::store::{ActionStatus, MediaFile, Store};
use photo_tidy::core::tidy::{FileMover, MoveRequest, TidyExecutor, TidyOptions};
use photo_tidy::error::TidyError;
use photo_tidy::events::{
    null_sender, CancellationToken, Event, EventChannel, TidyEvent, TidyStatus, TidySummary,
};
use predicates::prelude::*;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Library {
    _root: assert_fs::TempDir,
    source: assert_fs::fixture::ChildPath,
    target: PathBuf,
    db_path: PathBuf,
    store: Arc<Store>,
}

impl Library {
    fn new() -> Self {
        let root = assert_fs::TempDir::new().unwrap();
        let source = root.child("source");
        source.create_dir_all().unwrap();
        let target = root.path().join("library");
        let db_path = root.path().join("db").join("media.db");
        let store = Arc::new(Store::open(&db_path).unwrap());
        Self {
            _root: root,
            source,
            target,
            db_path,
            store,
        }
    }

    fn put(&self, relative: &str, bytes: &[u8]) {
        let child = self.source.child(relative);
        if let Some(parent) = child.path().parent() {
            fs::create_dir_all(parent).unwrap();
        }
        child.write_binary(bytes).unwrap();
    }

    fn scan(&self) {
        let scanner = Scanner::with_enricher(Arc::clone(&self.store), Box::new(NoMetadata));
        let options = ScanOptions {
            sources: vec![self.source.path().to_path_buf()],
            extensions: vec![".jpg".to_string()],
            follow_symlinks: false,
        };
        let summary = scanner.scan(&options, &CancellationToken::new(), &null_sender());
        assert!(summary.errors.is_empty(), "{:?}", summary.errors);
    }

    fn media(&self, relative: &str) -> MediaFile {
        self.store
            .get_media_by_path(self.source.child(relative).path())
            .unwrap()
            .unwrap()
    }

    fn date_dir(&self, file: &MediaFile) -> PathBuf {
        self.target
            .join(file.effective_date().format("%Y-%m-%d").to_string())
    }

    fn tidy(&self, executor: &TidyExecutor, options: &TidyOptions, ids: &[i64]) -> TidySummary {
        let requests: Vec<MoveRequest> = ids.iter().copied().map(MoveRequest::from).collect();
        executor
            .execute(options, &requests, &CancellationToken::new(), &null_sender())
            .unwrap()
    }
}

/// Lists every path under `root`, sorted
fn snapshot(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Rename always fails as if source and target were on different devices
struct CrossDeviceMover;

impl FileMover for CrossDeviceMover {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        #[cfg(unix)]
        return Err(io::Error::from_raw_os_error(18));
        #[cfg(not(unix))]
        return Err(io::Error::other("Invalid cross-device link"));
    }
}

/// Moves the file, then dies before the run can record the outcome
struct CrashAfterMove;

impl FileMover for CrashAfterMove {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)?;
        panic!("simulated crash after move");
    }
}

#[test]
fn duplicate_is_scanned_grouped_and_moved() {
    let lib = Library::new();
    lib.put("a.jpg", b"identical bytes");
    lib.put("b.jpg", b"identical bytes");
    lib.scan();

    let groups = lib.store.list_duplicate_groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);

    let second = groups[0].files[1].clone();
    assert_eq!(second.path, lib.source.child("b.jpg").path());

    let executor = TidyExecutor::new(Arc::clone(&lib.store));
    let options = TidyOptions::new(&lib.target).with_pattern("{Date}/{OriginalName}");
    let summary = lib.tidy(&executor, &options, &[second.id]);

    assert_eq!((summary.moved, summary.failed), (1, 0));
    assert!(!summary.dry_run);

    let expected = lib.date_dir(&second).join("b.jpg");
    assert_eq!(fs::read(&expected).unwrap(), b"identical bytes");
    lib.source.child("b.jpg").assert(predicate::path::missing());
    lib.source.child("a.jpg").assert(predicate::path::exists());

    let moved = lib.store.get_media_by_path(&expected).unwrap().unwrap();
    assert_eq!(moved.id, second.id);

    let actions = lib.store.list_actions(10, 0).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].status, ActionStatus::Completed);
    assert_eq!(actions[0].source_path, lib.source.child("b.jpg").path());
    assert_eq!(actions[0].target_path, expected);
}

#[test]
fn traversal_patterns_never_escape_the_base() {
    let lib = Library::new();
    lib.put("a.jpg", b"aaa");
    lib.scan();
    let id = lib.media("a.jpg").id;
    let executor = TidyExecutor::new(Arc::clone(&lib.store));

    for pattern in [
        "../{OriginalName}",
        "{Date}/../../../{OriginalName}",
        "..\\..\\{OriginalName}",
        " .. /{OriginalName}",
    ] {
        let options = TidyOptions::new(&lib.target).with_pattern(pattern);
        let summary = lib.tidy(&executor, &options, &[id]);
        assert_eq!(summary.failed, 1, "pattern {pattern}");
    }

    for pattern in ["/etc/{OriginalName}", "{Year}/./{Month}/{OriginalName}", "a:b|c/{Hash}{Ext}"] {
        let (sender, receiver) = EventChannel::new();
        let options = TidyOptions::new(&lib.target).with_pattern(pattern).dry_run(true);
        executor
            .execute(&options, &[MoveRequest::from(id)], &CancellationToken::new(), &sender)
            .unwrap();

        drop(sender);
        for event in receiver.iter() {
            if let Event::Tidy(TidyEvent::Progress(p)) = event {
                assert_eq!(p.status, TidyStatus::Planned, "pattern {pattern}");
                assert!(p.target.unwrap().starts_with(&lib.target), "pattern {pattern}");
            }
        }
    }

    lib.source.child("a.jpg").assert(predicate::path::exists());
    assert!(lib.store.list_actions(10, 0).unwrap().is_empty());
}

#[test]
fn colliding_names_get_numeric_suffix() {
    let lib = Library::new();
    lib.put("camera/name.jpg", b"from the camera");
    lib.put("phone/name.jpg", b"from the phone");
    lib.scan();
    let first = lib.media("camera/name.jpg");
    let second = lib.media("phone/name.jpg");

    let executor = TidyExecutor::new(Arc::clone(&lib.store));
    let options = TidyOptions::new(&lib.target).with_pattern("{OriginalName}");
    let summary = lib.tidy(&executor, &options, &[first.id, second.id]);

    assert_eq!((summary.moved, summary.failed), (2, 0));
    assert_eq!(fs::read(lib.target.join("name.jpg")).unwrap(), b"from the camera");
    assert_eq!(fs::read(lib.target.join("name-1.jpg")).unwrap(), b"from the phone");
}

#[test]
fn dry_run_leaves_filesystem_and_ledger_untouched() {
    let lib = Library::new();
    lib.put("a.jpg", b"aaa");
    lib.put("b.jpg", b"bbbb");
    lib.put("nested/c.jpg", b"ccccc");
    lib.scan();
    let ids: Vec<i64> = ["a.jpg", "b.jpg", "nested/c.jpg"]
        .iter()
        .map(|p| lib.media(p).id)
        .collect();
    let before = snapshot(lib.source.path());

    let executor = TidyExecutor::new(Arc::clone(&lib.store));
    let options = TidyOptions::new(&lib.target).dry_run(true);
    let summary = lib.tidy(&executor, &options, &ids);

    assert!(summary.dry_run);
    assert_eq!((summary.total, summary.moved, summary.failed), (3, 3, 0));
    assert_eq!(snapshot(lib.source.path()), before);
    assert!(!lib.target.exists());
    assert!(lib.store.list_actions(10, 0).unwrap().is_empty());
    assert_eq!(lib.media("a.jpg").path, lib.source.child("a.jpg").path());
}

#[test]
fn interrupted_run_leaves_pending_ledger_row() {
    let lib = Library::new();
    lib.put("a.jpg", b"aaa");
    lib.scan();
    let file = lib.media("a.jpg");

    let executor = TidyExecutor::with_mover(Arc::clone(&lib.store), Box::new(CrashAfterMove));
    let options = TidyOptions::new(&lib.target);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        executor.execute(
            &options,
            &[MoveRequest::from(file.id)],
            &CancellationToken::new(),
            &null_sender(),
        )
    }));
    assert!(outcome.is_err());
    drop(executor);

    // Restart: a fresh connection sees what the crashed run left behind
    let reopened = Store::open(&lib.db_path).unwrap();
    let pending = reopened.list_pending_actions().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, ActionStatus::Pending);
    assert_eq!(pending[0].executed_at, None);
    assert_eq!(pending[0].media_id, Some(file.id));
    assert_eq!(pending[0].source_path, file.path);

    let target = lib.date_dir(&file).join("a.jpg");
    assert_eq!(pending[0].target_path, target);
    assert!(target.exists());

    let row = reopened.get_media_by_path(&file.path).unwrap();
    assert_eq!(row.map(|r| r.id), Some(file.id));
}

#[test]
fn cross_device_move_copies_then_removes_source() {
    let lib = Library::new();
    let bytes: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
    lib.put("big.jpg", &bytes);
    lib.scan();
    let file = lib.media("big.jpg");

    let executor = TidyExecutor::with_mover(Arc::clone(&lib.store), Box::new(CrossDeviceMover));
    let options = TidyOptions::new(&lib.target).with_pattern("{OriginalName}");
    let summary = lib.tidy(&executor, &options, &[file.id]);

    assert_eq!((summary.moved, summary.failed), (1, 0));
    lib.source.child("big.jpg").assert(predicate::path::missing());
    assert_eq!(fs::read(lib.target.join("big.jpg")).unwrap(), bytes);

    let actions = lib.store.list_actions(10, 0).unwrap();
    assert_eq!(actions[0].status, ActionStatus::Completed);
}

#[test]
fn failed_path_update_marks_action_failed() {
    let lib = Library::new();
    lib.put("a.jpg", b"aaa");
    lib.scan();
    let file = lib.media("a.jpg");

    // A stale row already claims the target path, so the path update collides
    let target = lib.target.join("a.jpg");
    lib.store
        .upsert_media_file(&MediaFile {
            id: 0,
            path: target.clone(),
            ..file.clone()
        })
        .unwrap();

    let executor = TidyExecutor::new(Arc::clone(&lib.store));
    let options = TidyOptions::new(&lib.target).with_pattern("{OriginalName}");
    let summary = lib.tidy(&executor, &options, &[file.id]);

    assert_eq!((summary.moved, summary.failed), (0, 1));
    assert!(target.exists());

    let actions = lib.store.list_actions(10, 0).unwrap();
    assert_eq!(actions[0].status, ActionStatus::Failed);
    let message = actions[0].error_msg.as_deref().unwrap();
    assert!(message.starts_with("update media path"));
    assert!(message.chars().count() <= 240);
}

#[test]
fn unknown_pattern_field_fails_each_item() {
    let lib = Library::new();
    lib.put("a.jpg", b"aaa");
    lib.put("b.jpg", b"bbbb");
    lib.scan();
    let ids = [lib.media("a.jpg").id, lib.media("b.jpg").id];

    let executor = TidyExecutor::new(Arc::clone(&lib.store));
    let options = TidyOptions::new(&lib.target).with_pattern("{Camera}/{OriginalName}");
    let summary = lib.tidy(&executor, &options, &ids);

    assert_eq!((summary.total, summary.failed), (2, 2));
    lib.source.child("a.jpg").assert(predicate::path::exists());
}

#[test]
fn empty_batch_is_rejected_before_any_work() {
    let lib = Library::new();
    let executor = TidyExecutor::new(Arc::clone(&lib.store));

    let err = executor
        .execute(
            &TidyOptions::new(&lib.target),
            &[],
            &CancellationToken::new(),
            &null_sender(),
        )
        .unwrap_err();

    assert!(matches!(err, TidyError::EmptyBatch));
    assert!(!lib.target.exists());
}
