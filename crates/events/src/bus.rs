//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`CatalogEvent`]s. It is
//! shared via `Arc<EventBus>` between the catalog service (publisher) and the
//! dispatchers (subscribers).

use chrono::{DateTime, Utc};
use estate_core::audit::AuditRecord;
use estate_core::notification::NotificationMessage;
use estate_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// CatalogEvent
// ---------------------------------------------------------------------------

/// Who receives a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Recipient {
    User(DbId),
    Admins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub recipient: Recipient,
    pub message: NotificationMessage,
}

/// A listing mutation that has been written, with its pending side effects.
///
/// Constructed via [`CatalogEvent::new`] and enriched with
/// [`with_audit`](CatalogEvent::with_audit) and
/// [`with_notification`](CatalogEvent::with_notification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEvent {
    /// Dot-separated event name, e.g. `"listing.approved"`.
    pub event_type: String,
    pub listing_id: DbId,
    pub actor_id: DbId,
    pub audit: Option<AuditRecord>,
    pub notification: Option<NotificationTarget>,
    pub timestamp: DateTime<Utc>,
}

impl CatalogEvent {
    pub fn new(event_type: impl Into<String>, listing_id: DbId, actor_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            listing_id,
            actor_id,
            audit: None,
            notification: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_audit(mut self, record: AuditRecord) -> Self {
        self.audit = Some(record);
        self
    }

    pub fn with_notification(mut self, recipient: Recipient, message: NotificationMessage) -> Self {
        self.notification = Some(NotificationTarget { recipient, message });
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use estate_events::bus::{CatalogEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(CatalogEvent::new("listing.created", 1, 7));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Events published with no
    /// subscriber are dropped.
    pub fn publish(&self, event: CatalogEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("No event subscribers, event dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
