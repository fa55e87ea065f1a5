//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// All events emitted by scan and tidy runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scan run events
    Scan(ScanEvent),
    /// Tidy run events
    Tidy(TidyEvent),
}

/// Events during a scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { sources: Vec<PathBuf> },
    /// A file was fingerprinted and persisted
    Progress(ScanProgress),
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning finished (possibly cancelled)
    Completed(ScanSummary),
}

/// Progress information emitted after each persisted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    /// Absolute path of the file just persisted
    pub path: PathBuf,
    /// Accepted files seen so far
    pub files_processed: usize,
    /// Files persisted so far
    pub files_persisted: usize,
}

/// Outcome of a scan run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub files_discovered: usize,
    pub files_persisted: usize,
    pub files_skipped: usize,
    /// Non-fatal errors, one line per file or directory
    pub errors: Vec<String>,
    pub duration_ms: u64,
    pub duplicate_groups: usize,
    /// Set when the run stopped early on a cancellation request
    pub cancelled: bool,
}

/// Events during a tidy run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TidyEvent {
    /// Tidy run has started
    Started { total: usize, dry_run: bool },
    /// One item reached its outcome
    Progress(TidyProgress),
    /// Tidy run finished (possibly cancelled)
    Completed(TidySummary),
}

/// Outcome label of one tidy item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TidyStatus {
    /// Dry run: the move would happen
    Planned,
    /// File moved and ledger completed
    Moved,
    /// Already at its target
    Skipped,
    /// Requested id has no media row
    Missing,
    Failed,
}

impl TidyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Moved => "moved",
            Self::Skipped => "skipped",
            Self::Missing => "missing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TidyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress information emitted after every tidy item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyProgress {
    pub media_id: i64,
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub completed: usize,
    pub total: usize,
    pub status: TidyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a tidy run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidySummary {
    /// Tags the ledger rows this run wrote
    pub run_id: String,
    pub total: usize,
    /// Files moved (live) or planned (dry run)
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub dry_run: bool,
    pub target_base: PathBuf,
    pub cancelled: bool,
}
