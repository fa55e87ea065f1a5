//! Row types for the media store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One physical file known to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    /// Surrogate key (0 before the first upsert)
    pub id: i64,
    /// Absolute path, unique across rows
    pub path: PathBuf,
    pub content_hash: String,
    pub size_bytes: u64,
    /// Filesystem modification time, second precision
    pub mod_time: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub mime_type: Option<String>,
}

impl MediaFile {
    /// Capture time when known, otherwise the modification time
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.taken_at.unwrap_or(self.mod_time)
    }
}

/// Files sharing one content hash (two or more members)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub hash: String,
    /// Ordered by insertion id
    pub files: Vec<MediaFile>,
}

impl DuplicateGroup {
    /// Bytes reclaimable by keeping only the first member
    pub fn redundant_bytes(&self) -> u64 {
        self.files.iter().skip(1).map(|f| f.size_bytes).sum()
    }
}

/// Kind of relocation recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Move,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "move" => Some(Self::Move),
            _ => None,
        }
    }
}

/// Ledger state of one attempted action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Ledger row for one attempted relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAction {
    pub id: i64,
    pub media_id: Option<i64>,
    /// Tidy run that wrote this row
    pub run_id: Option<String>,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub error_msg: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
    /// Content hash at the time the action was recorded
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to open a ledger row; status always starts pending
#[derive(Debug, Clone)]
pub struct NewFileAction {
    pub media_id: Option<i64>,
    pub run_id: Option<String>,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub action_type: ActionType,
    pub content_hash: Option<String>,
}
