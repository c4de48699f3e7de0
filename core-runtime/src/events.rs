//! # Event Bus System
//!
//! Broadcasts typed events from the list sync core using
//! `tokio::sync::broadcast`, so hosts can react to pushes, pulls and local
//! list edits without polling.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps one enum per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ListSyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(ListSyncEvent::Pushed {
//!         list_id: "5f0c".to_string(),
//!         client_id: 42,
//!         client_list_id: "remote-1".to_string(),
//!         item_count: 3,
//!         created: true,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "List pushed to client");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber keeps receiving newer events.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.
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

/// Top-level event published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Push/pull outcomes against remote clients
    Sync(ListSyncEvent),
    /// Local edits to canonical lists
    Library(ListEvent),
}

impl CoreEvent {
    /// Short human-readable description
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(ListSyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(_) => EventSeverity::Info,
            CoreEvent::Library(_) => EventSeverity::Debug,
        }
    }
}

/// Event severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Outcome of a push or pull against one remote client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ListSyncEvent {
    /// Canonical list written to a client
    Pushed {
        list_id: String,
        client_id: u64,
        client_list_id: String,
        item_count: u32,
        /// Whether the remote list was created by this push
        created: bool,
    },
    /// Remote list read into the canonical store
    Pulled {
        list_id: String,
        client_id: u64,
        client_list_id: String,
        item_count: u32,
        /// Whether a new canonical list was created
        created: bool,
    },
    Failed {
        /// Canonical list, when known
        list_id: Option<String>,
        client_id: u64,
        /// "push" or "pull"
        operation: String,
        message: String,
    },
}

impl ListSyncEvent {
    fn description(&self) -> &str {
        match self {
            ListSyncEvent::Pushed { .. } => "List pushed to client",
            ListSyncEvent::Pulled { .. } => "List pulled from client",
            ListSyncEvent::Failed { .. } => "List sync failed",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ListEvent {
    ItemsAdded {
        list_id: String,
        count: u32,
    },
    ItemsRemoved {
        list_id: String,
        count: u32,
    },
    Reordered {
        list_id: String,
        item_count: u32,
    },
    SyncStatusChanged {
        list_id: String,
        client_id: u64,
        status: String,
    },
}

impl ListEvent {
    fn description(&self) -> &str {
        match self {
            ListEvent::ItemsAdded { .. } => "Items added to list",
            ListEvent::ItemsRemoved { .. } => "Items removed from list",
            ListEvent::Reordered { .. } => "List reordered",
            ListEvent::SyncStatusChanged { .. } => "Sync status changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel; cheap to clone, every clone publishes to the
/// same subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers that received it,
    /// or an error when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with an optional filter
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

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

/// Receiver that skips events rejected by its filter.
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

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
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

    fn pushed() -> CoreEvent {
        CoreEvent::Sync(ListSyncEvent::Pushed {
            list_id: "list-1".to_string(),
            client_id: 42,
            client_list_id: "remote-1".to_string(),
            item_count: 3,
            created: false,
        })
    }

    fn reordered() -> CoreEvent {
        CoreEvent::Library(ListEvent::Reordered {
            list_id: "list-1".to_string(),
            item_count: 3,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(pushed()).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        assert_eq!(bus.emit(pushed()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), pushed());
        assert_eq!(sub2.recv().await.unwrap(), pushed());
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = bus
            .stream()
            .filter(|event| matches!(event, CoreEvent::Sync(_)));

        bus.emit(reordered()).ok();
        bus.emit(pushed()).ok();

        assert_eq!(stream.recv().await.unwrap(), pushed());
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for _ in 0..5 {
            bus.emit(reordered()).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity_and_description() {
        let failed = CoreEvent::Sync(ListSyncEvent::Failed {
            list_id: None,
            client_id: 42,
            operation: "pull".to_string(),
            message: "remote unavailable".to_string(),
        });

        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(pushed().severity(), EventSeverity::Info);
        assert_eq!(reordered().severity(), EventSeverity::Debug);
        assert_eq!(failed.description(), "List sync failed");
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(pushed()).unwrap();
        assert_eq!(json["type"], "Sync");
        assert_eq!(json["payload"]["event"], "Pushed");
        assert_eq!(json["payload"]["client_id"], 42);
    }
}
