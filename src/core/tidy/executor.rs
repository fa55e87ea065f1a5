//! Executes tidy batches against the filesystem and the action ledger.

use super::mover::{FileMover, StdFileMover};
use super::planner::PathPlanner;
use super::types::{truncate_error, MoveRequest, TidyOptions};
use crate::core::store::{ActionStatus, ActionType, MediaFile, NewFileAction, Store};
use crate::error::TidyError;
use crate::events::{
    CancellationToken, Event, EventSender, TidyEvent, TidyProgress, TidyStatus, TidySummary,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Relocates media files, recording each move before it happens
pub struct TidyExecutor {
    store: Arc<Store>,
    mover: Box<dyn FileMover>,
}

/// Result of one requested move
struct ItemOutcome {
    status: TidyStatus,
    source: Option<PathBuf>,
    target: Option<PathBuf>,
    error: Option<String>,
}

impl ItemOutcome {
    fn new(status: TidyStatus, file: &MediaFile, target: Option<PathBuf>) -> Self {
        Self {
            status,
            source: Some(file.path.clone()),
            target,
            error: None,
        }
    }

    fn failed(file: &MediaFile, target: Option<PathBuf>, error: &str) -> Self {
        Self {
            error: Some(truncate_error(error)),
            ..Self::new(TidyStatus::Failed, file, target)
        }
    }
}

/// Per-run state shared by every item
struct Run<'a> {
    run_id: &'a str,
    dry_run: bool,
    planner: PathPlanner,
    media: HashMap<i64, MediaFile>,
    claimed: HashSet<PathBuf>,
}

impl TidyExecutor {
    /// Executor using plain `rename`
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_mover(store, Box::new(StdFileMover))
    }

    /// Executor with a custom mover
    pub fn with_mover(store: Arc<Store>, mover: Box<dyn FileMover>) -> Self {
        Self { store, mover }
    }

    /// Run a batch of moves, one at a time, in request order.
    ///
    /// An empty batch, an unset target base or a failed id lookup is an
    /// error. Everything that goes wrong with a single item is reported in
    /// its progress event and counted in the summary.
    pub fn execute(
        &self,
        options: &TidyOptions,
        requests: &[MoveRequest],
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<TidySummary, TidyError> {
        if requests.is_empty() {
            return Err(TidyError::EmptyBatch);
        }
        if options.target_base.as_os_str().is_empty() {
            return Err(TidyError::TargetBaseNotSet);
        }

        let ids: Vec<i64> = requests.iter().map(|r| r.media_id).collect();
        let media = self.store.get_media_by_ids(&ids)?;

        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let planner = PathPlanner::new(&options.target_base, options.effective_pattern())
            .create_directories(!options.dry_run);

        let mut summary = TidySummary {
            run_id: run_id.clone(),
            total: requests.len(),
            dry_run: options.dry_run,
            target_base: planner.base().to_path_buf(),
            ..Default::default()
        };
        let mut run = Run {
            run_id: &run_id,
            dry_run: options.dry_run,
            planner,
            media,
            claimed: HashSet::new(),
        };

        events.send(Event::Tidy(TidyEvent::Started {
            total: summary.total,
            dry_run: summary.dry_run,
        }));
        info!(run_id = %run_id, total = summary.total, dry_run = summary.dry_run, "tidy started");

        for (idx, request) in requests.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                info!(run_id = %run_id, completed = idx, "tidy cancelled");
                break;
            }

            let outcome = self.process(request, &mut run);
            match outcome.status {
                TidyStatus::Moved | TidyStatus::Planned => summary.moved += 1,
                TidyStatus::Skipped => summary.skipped += 1,
                TidyStatus::Missing | TidyStatus::Failed => summary.failed += 1,
            }

            events.send(Event::Tidy(TidyEvent::Progress(TidyProgress {
                media_id: request.media_id,
                source: outcome.source,
                target: outcome.target,
                completed: idx + 1,
                total: summary.total,
                status: outcome.status,
                error: outcome.error,
            })));
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            run_id = %run_id,
            moved = summary.moved,
            skipped = summary.skipped,
            failed = summary.failed,
            "tidy completed"
        );
        events.send(Event::Tidy(TidyEvent::Completed(summary.clone())));
        Ok(summary)
    }

    fn process(&self, request: &MoveRequest, run: &mut Run<'_>) -> ItemOutcome {
        let Some(file) = run.media.get(&request.media_id) else {
            warn!(media_id = request.media_id, "media file not found");
            return ItemOutcome {
                status: TidyStatus::Missing,
                source: None,
                target: None,
                error: Some("media file not found".to_string()),
            };
        };

        let target = match run.planner.plan(file, &run.claimed) {
            Ok(target) => target,
            Err(e) => {
                warn!(path = %file.path.display(), "plan failed: {}", e);
                return ItemOutcome::failed(file, None, &e.to_string());
            }
        };

        if target == file.path {
            debug!(path = %file.path.display(), "already in place");
            return ItemOutcome::new(TidyStatus::Skipped, file, Some(target));
        }
        run.claimed.insert(target.clone());

        if run.dry_run {
            debug!(from = %file.path.display(), to = %target.display(), "planned");
            return ItemOutcome::new(TidyStatus::Planned, file, Some(target));
        }

        // Write-ahead: nothing on disk changes without a pending row
        let action_id = match self.store.create_action(&NewFileAction {
            media_id: Some(file.id),
            run_id: Some(run.run_id.to_string()),
            source_path: file.path.clone(),
            target_path: target.clone(),
            action_type: ActionType::Move,
            content_hash: Some(file.content_hash.clone()),
        }) {
            Ok(id) => id,
            Err(e) => {
                warn!(path = %file.path.display(), "record action failed: {}", e);
                return ItemOutcome::failed(file, Some(target), &format!("record action: {e}"));
            }
        };

        if let Err(e) = self.mover.relocate(&file.path, &target) {
            let message = truncate_error(&e.to_string());
            warn!(path = %file.path.display(), "move failed: {}", message);
            self.close_action(action_id, ActionStatus::Failed, Some(&message));
            return ItemOutcome::failed(file, Some(target), &message);
        }

        if let Err(e) = self.store.update_media_path(file.id, &target) {
            // Bytes already moved; the failed row records the inconsistency
            let message = truncate_error(&format!("update media path: {e}"));
            warn!(path = %target.display(), "{}", message);
            self.close_action(action_id, ActionStatus::Failed, Some(&message));
            return ItemOutcome::failed(file, Some(target), &message);
        }

        self.close_action(action_id, ActionStatus::Completed, None);
        debug!(from = %file.path.display(), to = %target.display(), "moved");
        ItemOutcome::new(TidyStatus::Moved, file, Some(target))
    }

    fn close_action(&self, id: i64, status: ActionStatus, error: Option<&str>) {
        if let Err(e) = self.store.mark_action(id, status, error) {
            warn!(action_id = id, "failed to mark action {}: {}", status.as_str(), e);
        }
    }
}
