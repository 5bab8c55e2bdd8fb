//! # Event Bus System
//!
//! Typed notifications from the core to presentation code, carried over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The core never pushes data through the bus; it only announces that
//! something changed. Subscribers re-read the state they care about (for
//! example `FileStore::get_all`) when the matching event arrives.
//!
//! ```text
//! ┌───────────────┐  emit   ┌──────────┐  subscribe  ┌──────────────┐
//! │ FileStore     ├────────>│          ├────────────>│ Presentation │
//! ├───────────────┤         │ EventBus │             └──────────────┘
//! │ BusyRegistry  ├────────>│          │
//! ├───────────────┤         │          │
//! │ ChangeStream  ├────────>│          │
//! └───────────────┘         └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, FilesEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Files(FilesEvent::SnapshotApplied { count: 3 })).ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event, CoreEvent::Files(FilesEvent::SnapshotApplied { count: 3 }));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   re-read the current state and continue.
//! - **`RecvError::Closed`**: every sender is gone, the session shut down.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// The file collection changed
    Files(FilesEvent),
    /// A busy token appeared or disappeared
    Busy(BusyEvent),
    /// Change stream lifecycle
    Channel(ChannelEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Files(e) => e.description(),
            CoreEvent::Busy(e) => e.description(),
            CoreEvent::Channel(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Channel(ChannelEvent::FrameDropped { .. }) => EventSeverity::Warning,
            CoreEvent::Channel(ChannelEvent::Unavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Channel(ChannelEvent::Connected) => EventSeverity::Info,
            CoreEvent::Channel(ChannelEvent::Closed) => EventSeverity::Info,
            CoreEvent::Files(FilesEvent::SnapshotApplied { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Files Events
// ============================================================================

/// Changes to the reconciled file collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FilesEvent {
    /// The collection was replaced by a snapshot.
    SnapshotApplied {
        /// Number of files after the replace.
        count: usize,
    },
    /// A change message was applied.
    ChangeApplied {
        /// Wire name of the message type, e.g. `update_file`.
        kind: String,
        /// Number of entries in the message payload.
        entries: usize,
        /// Number of files after the change.
        count: usize,
    },
}

impl FilesEvent {
    fn description(&self) -> &str {
        match self {
            FilesEvent::SnapshotApplied { .. } => "File snapshot applied",
            FilesEvent::ChangeApplied { .. } => "File change applied",
        }
    }
}

// ============================================================================
// Busy Events
// ============================================================================

/// Transitions of busy tokens. Only emitted when set membership changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BusyEvent {
    Started { token: String },
    Ended { token: String },
}

impl BusyEvent {
    fn description(&self) -> &str {
        match self {
            BusyEvent::Started { .. } => "Operation started",
            BusyEvent::Ended { .. } => "Operation ended",
        }
    }
}

// ============================================================================
// Channel Events
// ============================================================================

/// Lifecycle of the live change stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ChannelEvent {
    /// The channel is open and frames are being applied.
    Connected,
    /// No channel could be opened; the session is snapshot-only.
    Unavailable { reason: String },
    /// The channel closed; no further live updates will arrive.
    Closed,
    /// A frame could not be decoded and was skipped.
    FrameDropped { reason: String },
}

impl ChannelEvent {
    fn description(&self) -> &str {
        match self {
            ChannelEvent::Connected => "Live updates connected",
            ChannelEvent::Unavailable { .. } => "Live updates unavailable",
            ChannelEvent::Closed => "Live updates closed",
            ChannelEvent::FrameDropped { .. } => "Malformed update dropped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls behind by more than `capacity` events receives
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let files_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Files(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(kind: &str, count: usize) -> CoreEvent {
        CoreEvent::Files(FilesEvent::ChangeApplied {
            kind: kind.to_string(),
            entries: 1,
            count,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(change("update_file", 1)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Busy(BusyEvent::Started {
            token: "media-upload".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Channel(_)));

        bus.emit(change("create_file", 1)).ok();
        bus.emit(CoreEvent::Channel(ChannelEvent::Connected)).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, CoreEvent::Channel(ChannelEvent::Connected));
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(change("update_file", i)).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity_and_description() {
        let dropped = CoreEvent::Channel(ChannelEvent::FrameDropped {
            reason: "expected value".to_string(),
        });
        assert_eq!(dropped.severity(), EventSeverity::Warning);
        assert_eq!(dropped.description(), "Malformed update dropped");

        let snapshot = CoreEvent::Files(FilesEvent::SnapshotApplied { count: 2 });
        assert_eq!(snapshot.severity(), EventSeverity::Info);

        assert_eq!(change("delete_file", 0).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization() {
        let event = change("refresh_files", 4);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("refresh_files"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        let event = CoreEvent::Busy(BusyEvent::Ended {
            token: "files-fetch".to_string(),
        });
        bus.emit(event.clone()).ok();
        assert_eq!(stream.try_recv().unwrap().unwrap(), event);
    }
}
