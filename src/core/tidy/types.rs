//! Types for the tidy module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = "{Date}/{OriginalName}";

/// Longest error text kept on a ledger row or progress event
pub const MAX_ERROR_LEN: usize = 240;

/// Request to relocate one media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub media_id: i64,
}

impl From<i64> for MoveRequest {
    fn from(media_id: i64) -> Self {
        Self { media_id }
    }
}

/// How a tidy run should behave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyOptions {
    /// Folder every target must stay under
    pub target_base: PathBuf,
    /// Naming pattern; blank means [`DEFAULT_PATTERN`]
    pub pattern: String,
    /// Plan and report without touching the filesystem or the ledger
    pub dry_run: bool,
}

impl TidyOptions {
    pub fn new(target_base: impl Into<PathBuf>) -> Self {
        Self {
            target_base: target_base.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            dry_run: false,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Configured pattern, or the default when blank
    pub fn effective_pattern(&self) -> &str {
        if self.pattern.trim().is_empty() {
            DEFAULT_PATTERN
        } else {
            &self.pattern
        }
    }
}

/// Cap an error message at [`MAX_ERROR_LEN`] characters
pub fn truncate_error(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_LEN) {
        Some((cut, _)) => message[..cut].to_string(),
        None => message.to_string(),
    }
}
