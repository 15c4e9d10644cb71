//! Catalog event types, envelope, and event bus for lifecycle notifications.
//!
//! Stores publish their state transitions here so independent consumers
//! (UI banners, telemetry, tests) can observe them without holding a
//! reference to the store. Dataset contents never travel on the bus; it
//! carries transitions and counts only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

// ============================================================================
// Event Envelope
// ============================================================================

/// Versioned wrapper around a [`CatalogEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"sync.live"`).
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Payload schema version.
    pub payload_version: u32,
    pub payload: CatalogEvent,
}

impl EventEnvelope {
    pub fn new(event: CatalogEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Catalog Event (domain payloads)
// ============================================================================

/// Lifecycle transitions of the catalog stores.
///
/// Serialized as JSON with a `type` tag, e.g.
/// `{"type":"SyncLive","collection":"diamonds","attempt":1,"item_count":40}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// A connection attempt began.
    SyncConnecting { collection: String, attempt: u64 },
    /// A non-empty remote snapshot was applied.
    SyncLive {
        collection: String,
        attempt: u64,
        item_count: usize,
    },
    /// The bundled dataset replaced the remote one.
    SyncOffline {
        collection: String,
        attempt: u64,
        reason: String,
        item_count: usize,
    },
    /// Neither the remote nor the bundled dataset is available.
    SyncFailed {
        collection: String,
        attempt: u64,
        reason: String,
    },
    /// The merged category list changed.
    CategoriesUpdated {
        category_count: usize,
        fallback: bool,
    },
}

impl CatalogEvent {
    /// Namespaced event type for the envelope (e.g., `"sync.offline"`).
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            CatalogEvent::SyncConnecting { .. } => "sync.connecting",
            CatalogEvent::SyncLive { .. } => "sync.live",
            CatalogEvent::SyncOffline { .. } => "sync.offline",
            CatalogEvent::SyncFailed { .. } => "sync.failed",
            CatalogEvent::CategoriesUpdated { .. } => "categories.updated",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus for catalog lifecycle events.
///
/// Slow receivers that fall behind get a `Lagged` error and miss events;
/// the stores' `watch()` channels remain the source of truth for state.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: CatalogEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
