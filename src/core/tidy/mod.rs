//! # Tidy Module
//!
//! Relocates media files into the target layout.
//!
//! ## Per-item flow
//! 1. Plan a target path from the naming pattern
//! 2. Skip files already at their target
//! 3. Record a pending ledger row (live runs only)
//! 4. Move the file, falling back to copy+delete across devices
//! 5. Point the media row at the new path and close the ledger row

mod executor;
mod mover;
mod planner;
mod types;

pub use executor::TidyExecutor;
pub use mover::{copy_then_remove, is_cross_device, FileMover, StdFileMover};
pub use planner::{sanitize_relative, sanitize_segment, NamePattern, PathPlanner, PatternFields};
pub use types::{truncate_error, MoveRequest, TidyOptions, DEFAULT_PATTERN, MAX_ERROR_LEN};
