//! Broadcast channel for inventory events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The ingestion
//! side publishes [`BusEvent::HostDataInserted`] after storing a snapshot;
//! the alert worker subscribes and reacts. Persisted alerts are announced
//! back on the same bus as [`BusEvent::AlertInserted`].

use serde::Serialize;
use tokio::sync::broadcast;

use super::AlertCode;

/// Topic name for "snapshot inserted" notifications.
pub const TOPIC_HOSTDATA_INSERTION: &str = "hostdata.insertion";

/// Topic name for "alert persisted" notifications.
pub const TOPIC_ALERT_INSERTION: &str = "alert.insertion";

/// Field of the insertion payload that carries the snapshot identifier.
pub const SNAPSHOT_ID_FIELD: &str = "id";

/// Event travelling on the bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "topic")]
pub enum BusEvent {
    /// A snapshot was stored.
    ///
    /// The payload is kept raw; the handler validates it.
    #[serde(rename = "hostdata.insertion")]
    HostDataInserted {
        /// Notification fields, expected to hold the snapshot id under `id`.
        payload: serde_json::Value,
    },

    /// An alert was persisted.
    #[serde(rename = "alert.insertion")]
    AlertInserted {
        /// Store-assigned alert identifier.
        alert_id: i64,
        /// Alert classification.
        alert_code: AlertCode,
        /// Machine the alert refers to.
        hostname: String,
    },
}

impl BusEvent {
    /// Builds an insertion notification for the given snapshot id.
    #[must_use]
    pub fn hostdata_inserted(snapshot_id: impl ToString) -> Self {
        Self::HostDataInserted {
            payload: serde_json::json!({ SNAPSHOT_ID_FIELD: snapshot_id.to_string() }),
        }
    }

    /// Returns the topic this event belongs to.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::HostDataInserted { .. } => TOPIC_HOSTDATA_INSERTION,
            Self::AlertInserted { .. } => TOPIC_ALERT_INSERTION,
        }
    }
}

/// Broadcast bus for [`BusEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: BusEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SnapshotId;

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        let count = bus.publish(BusEvent::hostdata_inserted(SnapshotId::new()));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let id = SnapshotId::new();
        bus.publish(BusEvent::hostdata_inserted(id));

        let Ok(BusEvent::HostDataInserted { payload }) = rx.recv().await else {
            panic!("expected an insertion event");
        };
        assert_eq!(payload[SNAPSHOT_ID_FIELD], id.to_string());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let count = bus.publish(BusEvent::AlertInserted {
            alert_id: 7,
            alert_code: AlertCode::NewServer,
            hostname: "superhost1".to_string(),
        });
        assert_eq!(count, 2);

        let Ok(e1) = rx1.recv().await else {
            panic!("rx1 failed");
        };
        let Ok(e2) = rx2.recv().await else {
            panic!("rx2 failed");
        };
        assert_eq!(e1.topic(), TOPIC_ALERT_INSERTION);
        assert_eq!(e2.topic(), TOPIC_ALERT_INSERTION);
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }

    #[test]
    fn serializes_with_topic_tag() {
        let event = BusEvent::hostdata_inserted("abc");
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("event should serialize");
        };
        assert_eq!(json["topic"], TOPIC_HOSTDATA_INSERTION);
        assert_eq!(json["payload"]["id"], "abc");
    }
}
