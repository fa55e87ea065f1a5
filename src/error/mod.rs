//! # Error Module
//!
//! Error types for the media tidy engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, ids, what went wrong
//! - **Per-file errors are data** - only configuration-class failures unwind
//!   to the caller; a bad file or a failed move is reported, not thrown

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoTidyError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Tidy error: {0}")]
    Tidy(#[from] TidyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Another scan or tidy run is already in progress")]
    Busy,
}

/// Errors that occur while walking source folders
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the SQLite store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Database handle at {path} is unusable after a panic. Restart the application.")]
    Poisoned { path: PathBuf },

    #[error("No media file with id {id}")]
    NotFound { id: i64 },

    #[error("File action {id} is not pending and cannot change state again")]
    ActionNotPending { id: i64 },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

/// Errors computing a target path for one file
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Target path escapes base folder: {path}")]
    PathEscape { path: PathBuf },

    #[error("Unable to find unique name for {path}")]
    UniqueNameExhausted { path: PathBuf },

    #[error("Failed to create target directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to inspect {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown pattern field: {{{field}}}")]
    UnknownField { field: String },
}

/// Run-level tidy failures (item-level failures are reported as progress data)
#[derive(Error, Debug)]
pub enum TidyError {
    #[error("Target base folder is not configured")]
    TargetBaseNotSet,

    #[error("No files were selected")]
    EmptyBatch,

    #[error("Failed to look up media files: {0}")]
    Store(#[from] StoreError),
}

/// Errors loading the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoTidyError>;
