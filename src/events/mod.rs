//! # Events Module
//!
//! Event-driven progress reporting for scan and tidy runs.
//!
//! ## Design
//! The engine emits events through channels, allowing any shell
//! (CLI, desktop, web) to subscribe and display progress. Events are sent
//! synchronously from the worker, so receivers should drain promptly.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Scan(ScanEvent::Progress(p)) = event {
//!             println!("{} persisted", p.files_persisted);
//!         }
//!     }
//! });
//!
//! let summary = scanner.scan(&options, &CancellationToken::new(), &sender);
//! ```

mod channel;
mod types;

pub use channel::{null_sender, CancellationToken, EventChannel, EventReceiver, EventSender};
pub use types::*;
