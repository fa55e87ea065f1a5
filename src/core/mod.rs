//! # Core Module
//!
//! The front-end-agnostic media tidy engine.
//!
//! ## Modules
//! - `scanner` - Discovers media files and records them in the store
//! - `fingerprint` - Content digests and MIME classification
//! - `metadata` - Capture time and camera details from EXIF
//! - `store` - SQLite persistence for media rows and the action ledger
//! - `tidy` - Plans target paths and moves files into the library layout

pub mod fingerprint;
pub mod metadata;
pub mod scanner;
pub mod store;
pub mod tidy;

// Re-export commonly used types
pub use metadata::{CaptureMetadata, MetadataEnricher};
pub use scanner::{ScanOptions, Scanner};
pub use store::{DuplicateGroup, FileAction, MediaFile, Store};
pub use tidy::{MoveRequest, PathPlanner, TidyExecutor, TidyOptions};
