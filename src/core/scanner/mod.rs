//! # Scanner Module
//!
//! Discovers media files under source folders, fingerprints them and
//! upserts them into the store.
//!
//! ## Behaviour
//! - Walks every source root in order, strictly one file at a time
//! - Applies the extension allow-list (empty = everything)
//! - Skips symlinks unless following is enabled
//! - Per-file failures are logged into the summary; the walk continues
//!
//! ## Example
//! ```rust,ignore
//! use photo_tidy::core::scanner::{ScanOptions, Scanner};
//!
//! let scanner = Scanner::new(store.clone());
//! let summary = scanner.scan(&options, &CancellationToken::new(), &null_sender());
//! println!("{} duplicate groups", summary.duplicate_groups);
//! ```

mod filter;
mod walker;

pub use filter::{dotted_extension, normalize_extension, ExtensionFilter};
pub use walker::Scanner;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inputs for one scan run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Folders to walk, in order
    pub sources: Vec<PathBuf>,
    /// Allow-list of extensions; empty accepts every file
    pub extensions: Vec<String>,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
}
