//! Event channel implementation using crossbeam-channel.
//!
//! Provides a thread-safe way to send events from the engine to any
//! shell, plus the cooperative cancellation flag shells hand back.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Event;

/// Sends events from the engine.
///
/// Thin wrapper around crossbeam's Sender that can be cloned and sent
/// across threads.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// If the receiver is dropped, the event is silently discarded so
    /// progress reporting stays optional.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receives events from the engine.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Events in send order; ends once every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Unbounded sender/receiver pairs; a scan or tidy run never blocks on a slow shell.
pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A no-op event sender for when you don't need progress reporting.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

/// Cooperative cancellation flag shared between a shell and a running job.
///
/// Scans check it between files and between source roots; tidy runs check
/// it between items, never in the middle of a move.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ScanEvent, ScanProgress};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                path: PathBuf::from("/test/a.jpg"),
                files_processed: 5,
                files_persisted: 4,
            })));
        });

        handle.join().unwrap();

        match receiver.iter().next().unwrap() {
            Event::Scan(ScanEvent::Progress(p)) => {
                assert_eq!(p.files_processed, 5);
            }
            _ => panic!("Wrong event type"),
        };
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Scan(ScanEvent::Started { sources: vec![] }));
    }

    #[test]
    fn receiver_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::new();
        let worker = sender.clone();
        worker.send(Event::Scan(ScanEvent::Started { sources: vec![] }));
        drop(worker);
        drop(sender);

        assert_eq!(receiver.iter().count(), 1);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());

        token.cancel();
        assert!(observer.is_cancelled());
    }
}
