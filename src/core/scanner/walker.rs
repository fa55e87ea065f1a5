//! Directory walking implementation using walkdir.

use super::{filter::ExtensionFilter, ScanOptions};
use crate::core::fingerprint::{detect_mime, fingerprint_file};
use crate::core::metadata::{ExifEnricher, MetadataEnricher};
use crate::core::store::{MediaFile, Store};
use crate::error::ScanError;
use crate::events::{CancellationToken, Event, EventSender, ScanEvent, ScanProgress, ScanSummary};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Walks source folders and persists what it finds
pub struct Scanner {
    store: Arc<Store>,
    enricher: Box<dyn MetadataEnricher>,
}

/// Counters for one run
struct RunState<'a> {
    summary: ScanSummary,
    events: &'a EventSender,
}

impl RunState<'_> {
    fn record_error(&mut self, path: &Path, message: String) {
        warn!(path = %path.display(), "{}", message);
        self.events.send(Event::Scan(ScanEvent::Error {
            path: path.to_path_buf(),
            message: message.clone(),
        }));
        self.summary.errors.push(message);
    }
}

enum Walk {
    Finished,
    Cancelled,
}

impl Scanner {
    /// Scanner reading capture metadata from EXIF
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_enricher(store, Box::new(ExifEnricher))
    }

    /// Scanner with a custom metadata source
    pub fn with_enricher(store: Arc<Store>, enricher: Box<dyn MetadataEnricher>) -> Self {
        Self { store, enricher }
    }

    /// Walk every source, persisting accepted files one at a time.
    ///
    /// Never fails as a whole: per-file and per-directory problems land in
    /// `summary.errors`. A cancelled run returns the partial summary with
    /// `cancelled` set and skips the duplicate count.
    pub fn scan(
        &self,
        options: &ScanOptions,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> ScanSummary {
        let start = Instant::now();
        let filter = ExtensionFilter::new(&options.extensions);
        let mut run = RunState {
            summary: ScanSummary::default(),
            events,
        };

        events.send(Event::Scan(ScanEvent::Started {
            sources: options.sources.clone(),
        }));
        info!(sources = options.sources.len(), "scan started");

        for source in &options.sources {
            if cancel.is_cancelled() {
                return self.finish_cancelled(run, start);
            }

            let root = match self.resolve_root(source) {
                Ok(root) => root,
                Err(e) => {
                    run.record_error(source, e.to_string());
                    continue;
                }
            };

            if let Walk::Cancelled = self.walk_root(&root, options, &filter, cancel, &mut run) {
                return self.finish_cancelled(run, start);
            }
        }

        run.summary.duration_ms = start.elapsed().as_millis() as u64;

        match self.store.list_duplicate_groups() {
            Ok(groups) => run.summary.duplicate_groups = groups.len(),
            Err(e) => {
                let message = format!("duplicate query: {e}");
                warn!("{}", message);
                run.summary.errors.push(message);
            }
        }

        info!(
            discovered = run.summary.files_discovered,
            persisted = run.summary.files_persisted,
            skipped = run.summary.files_skipped,
            errors = run.summary.errors.len(),
            duplicate_groups = run.summary.duplicate_groups,
            "scan completed"
        );
        events.send(Event::Scan(ScanEvent::Completed(run.summary.clone())));
        run.summary
    }

    fn finish_cancelled(&self, mut run: RunState<'_>, start: Instant) -> ScanSummary {
        run.summary.cancelled = true;
        run.summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(persisted = run.summary.files_persisted, "scan cancelled");
        run.events
            .send(Event::Scan(ScanEvent::Completed(run.summary.clone())));
        run.summary
    }

    /// Absolute path of a source root, verified to be a directory
    fn resolve_root(&self, source: &Path) -> Result<PathBuf, ScanError> {
        let root = absolutize(source).map_err(|e| ScanError::ReadDirectory {
            path: source.to_path_buf(),
            source: e,
        })?;

        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => Ok(root),
            Ok(_) => Err(ScanError::NotADirectory { path: root }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ScanError::DirectoryNotFound { path: root })
            }
            Err(e) => Err(ScanError::ReadDirectory {
                path: root,
                source: e,
            }),
        }
    }

    fn walk_root(
        &self,
        root: &Path,
        options: &ScanOptions,
        filter: &ExtensionFilter,
        cancel: &CancellationToken,
        run: &mut RunState<'_>,
    ) -> Walk {
        // Sorted so that insertion ids follow a stable, repeatable order
        let walker = WalkDir::new(root)
            .follow_links(options.follow_symlinks)
            .sort_by_file_name();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    run.record_error(&path, format!("walk {}: {}", path.display(), e));
                    continue;
                }
            };

            // With following disabled walkdir reports links without descending into them.
            // Linked directories are passed over without counting, like real ones.
            if entry.path_is_symlink() && !options.follow_symlinks && entry.depth() > 0 {
                if !entry.path().is_dir() {
                    debug!(path = %entry.path().display(), "skipping symlink");
                    run.summary.files_skipped += 1;
                }
                continue;
            }

            if entry.file_type().is_dir() {
                continue;
            }

            // Opening a FIFO blocks until a writer shows up
            if !entry.file_type().is_file() {
                debug!(path = %entry.path().display(), "skipping non-regular file");
                run.summary.files_skipped += 1;
                continue;
            }

            if !filter.should_include(entry.path()) {
                run.summary.files_skipped += 1;
                continue;
            }

            if cancel.is_cancelled() {
                return Walk::Cancelled;
            }

            run.summary.files_discovered += 1;
            self.process_file(entry.path(), run);
        }

        Walk::Finished
    }

    fn process_file(&self, path: &Path, run: &mut RunState<'_>) {
        let file = match self.build_media_file(path) {
            Ok(file) => file,
            Err(e) => {
                run.record_error(path, format!("metadata {}: {}", path.display(), e));
                return;
            }
        };

        if let Err(e) = self.store.upsert_media_file(&file) {
            run.record_error(path, format!("persist {}: {}", path.display(), e));
            return;
        }

        run.summary.files_persisted += 1;
        debug!(path = %file.path.display(), hash = %file.content_hash, "persisted");

        run.events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
            path: file.path,
            files_processed: run.summary.files_discovered,
            files_persisted: run.summary.files_persisted,
        })));
    }

    fn build_media_file(&self, path: &Path) -> io::Result<MediaFile> {
        let absolute = absolutize(path)?;
        let fingerprint = fingerprint_file(&absolute)?;
        let capture = self.enricher.enrich(&absolute);
        let mime_type = detect_mime(&absolute);

        Ok(MediaFile {
            id: 0,
            path: absolute,
            content_hash: fingerprint.content_hash,
            size_bytes: fingerprint.size_bytes,
            mod_time: to_utc_seconds(fingerprint.modified),
            taken_at: capture.taken_at,
            camera_make: capture.camera_make,
            camera_model: capture.camera_model,
            mime_type,
        })
    }
}

fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Modification time truncated to whole seconds, matching what the store keeps
fn to_utc_seconds(time: SystemTime) -> DateTime<Utc> {
    let dt: DateTime<Utc> = time.into();
    DateTime::<Utc>::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}
