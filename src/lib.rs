//! # Photo Tidy
//!
//! Finds duplicate photos and videos by content and files them into a
//! date-based library layout.
//!
//! ## Core Philosophy
//! - **Never delete** - files are only ever moved, duplicates are reported
//! - **Record before acting** - every move is written to the ledger first
//! - **One bad file never stops a run** - per-file problems are reported as data
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - Scanner, fingerprinting, store and tidy executor
//! - `app` - Application context owning settings and the open store
//! - `config` - `settings.toml` loading
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use app::AppContext;
pub use error::{PhotoTidyError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
