//! # Store Module
//!
//! Durable persistence for discovered media files and the tidy action ledger.
//!
//! ## Features
//! - SQLite with WAL journaling
//! - Insert-or-replace keyed on path for scan upserts
//! - Duplicate grouping by content hash
//! - Write-ahead ledger rows for every live relocation
//!
//! All access goes through one connection behind a mutex, so no two
//! operations ever write concurrently.

mod repository;
mod types;

pub use repository::Store;
pub use types::{
    ActionStatus, ActionType, DuplicateGroup, FileAction, MediaFile, NewFileAction,
};
