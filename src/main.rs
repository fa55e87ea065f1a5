//! # photo-tidy CLI
//!
//! Command-line interface for the media tidy engine.
//!
//! ## Usage
//! ```bash
//! photo-tidy scan
//! photo-tidy --config ./settings.toml duplicates --output json
//! photo-tidy tidy 12 15 --dry-run
//! ```

mod cli;

use photo_tidy::Result;

fn main() -> Result<()> {
    photo_tidy::init_tracing();
    cli::run()
}
