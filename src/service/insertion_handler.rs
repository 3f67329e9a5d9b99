//! Insertion handler: reacts to "snapshot inserted" notifications.
//!
//! For each event: extract the snapshot id, fetch the snapshot and its
//! predecessor, diff them, persist the alerts in order and announce each
//! persisted alert on the bus. Any failure aborts the event; alerts
//! already persisted stay persisted.

use std::sync::Arc;

use crate::clock::Clock;
use crate::domain::event_bus::SNAPSHOT_ID_FIELD;
use crate::domain::{BusEvent, EventBus, SnapshotId};
use crate::error::AlertServiceError;
use crate::persistence::{AlertStore, SnapshotStore};
use crate::service::DiffEngine;

/// Event-driven entry point of the alert engine.
///
/// Stateless apart from its injected collaborators, so concurrent
/// invocations for different events need no coordination.
#[derive(Debug, Clone)]
pub struct InsertionHandler {
    snapshots: Arc<dyn SnapshotStore>,
    alerts: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    engine: DiffEngine,
    event_bus: Option<EventBus>,
}

impl InsertionHandler {
    /// Creates a handler over the given stores, clock and engine.
    #[must_use]
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        alerts: Arc<dyn AlertStore>,
        clock: Arc<dyn Clock>,
        engine: DiffEngine,
    ) -> Self {
        Self {
            snapshots,
            alerts,
            clock,
            engine,
            event_bus: None,
        }
    }

    /// Announces every persisted alert on `event_bus`.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Handles one insertion notification. Never fails: outcomes are
    /// either persisted alerts or a logged error.
    pub async fn handle(&self, payload: &serde_json::Value) {
        match self.process(payload).await {
            Ok(count) => tracing::debug!(alerts = count, "insertion processed"),
            Err(AlertServiceError::MalformedEvent(reason)) => {
                tracing::warn!(%reason, %payload, "dropping malformed insertion event");
            }
            Err(error) => {
                tracing::error!(%error, code = error.error_code(), "insertion processing failed");
            }
        }
    }

    /// Processes one insertion notification and returns the number of
    /// alerts persisted.
    ///
    /// The predecessor is the most recent snapshot of the same host
    /// recorded before the clock reading. If that turns out to be the new
    /// snapshot itself, the lookup is repeated bounded by its `created_at`.
    ///
    /// # Errors
    ///
    /// * [`AlertServiceError::MalformedEvent`] - payload lacks a valid id;
    ///   no store was contacted
    /// * [`AlertServiceError::Store`] - a fetch or insert failed; remaining
    ///   alerts for this event were not attempted
    /// * [`AlertServiceError::Diff`] - a snapshot lists a database twice
    pub async fn process(&self, payload: &serde_json::Value) -> Result<usize, AlertServiceError> {
        let id = extract_snapshot_id(payload)?;

        let new = self.snapshots.fetch_by_id(id).await?;

        let now = self.clock.now();
        let mut prior = self
            .snapshots
            .fetch_most_recent_before(&new.hostname, now)
            .await?;
        if prior.as_ref().is_some_and(|p| p.id == new.id) {
            // The store already holds the new snapshot; step past it.
            prior = self
                .snapshots
                .fetch_most_recent_before(&new.hostname, new.created_at)
                .await?;
        }

        tracing::debug!(
            snapshot_id = %id,
            hostname = %new.hostname,
            prior_id = ?prior.as_ref().map(|p| p.id),
            "diffing snapshots"
        );

        let alerts = self.engine.diff(prior.as_ref(), &new, now)?;

        for alert in &alerts {
            let alert_id = self.alerts.insert(alert).await?;
            tracing::info!(
                alert_id,
                alert_code = %alert.code(),
                hostname = %new.hostname,
                dbname = alert.payload.dbname(),
                "alert raised"
            );
            if let Some(bus) = &self.event_bus {
                let delivered = bus.publish(BusEvent::AlertInserted {
                    alert_id,
                    alert_code: alert.code(),
                    hostname: new.hostname.clone(),
                });
                tracing::debug!(alert_id, delivered, "alert announced");
            }
        }

        Ok(alerts.len())
    }
}

/// Reads the snapshot id from the `id` field of an insertion payload.
///
/// # Errors
///
/// Returns [`AlertServiceError::MalformedEvent`] if the payload is not an
/// object, the field is missing, or its value is not a snapshot id.
pub fn extract_snapshot_id(payload: &serde_json::Value) -> Result<SnapshotId, AlertServiceError> {
    let fields = payload
        .as_object()
        .ok_or_else(|| AlertServiceError::MalformedEvent("payload is not an object".to_string()))?;
    let raw = fields.get(SNAPSHOT_ID_FIELD).ok_or_else(|| {
        AlertServiceError::MalformedEvent(format!("missing `{SNAPSHOT_ID_FIELD}` field"))
    })?;
    let text = raw.as_str().ok_or_else(|| {
        AlertServiceError::MalformedEvent(format!("`{SNAPSHOT_ID_FIELD}` is not a string"))
    })?;
    text.parse()
        .map_err(|e| AlertServiceError::MalformedEvent(format!("invalid snapshot id {text:?}: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::{Alert, AlertCode, AlertPayload, Database, Snapshot};
    use crate::error::StoreError;
    use crate::persistence::models::StoredAlert;
    use crate::persistence::{MemoryAlertStore, MemorySnapshotStore};

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::days(18_205)
    }

    /// Snapshot store that counts calls and can be told to fail.
    #[derive(Debug, Default)]
    struct ScriptedSnapshots {
        inner: MemorySnapshotStore,
        fail_fetch: bool,
        fail_prior: bool,
        fetches: AtomicUsize,
        prior_lookups: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotStore for ScriptedSnapshots {
        async fn fetch_by_id(&self, id: SnapshotId) -> Result<Snapshot, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch {
                return Err(StoreError::Query("connection reset".to_string()));
            }
            self.inner.fetch_by_id(id).await
        }

        async fn fetch_most_recent_before(
            &self,
            hostname: &str,
            before: DateTime<Utc>,
        ) -> Result<Option<Snapshot>, StoreError> {
            self.prior_lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_prior {
                return Err(StoreError::Query("connection reset".to_string()));
            }
            self.inner.fetch_most_recent_before(hostname, before).await
        }

        async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError> {
            self.inner.insert_snapshot(snapshot).await
        }
    }

    /// Alert store that fails on the n-th insert (1-based).
    #[derive(Debug, Default)]
    struct FailingAlerts {
        inner: MemoryAlertStore,
        fail_on: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AlertStore for FailingAlerts {
        async fn insert(&self, alert: &Alert) -> Result<i64, StoreError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt == self.fail_on {
                return Err(StoreError::Query("disk full".to_string()));
            }
            self.inner.insert(alert).await
        }

        async fn list_alerts(&self) -> Result<Vec<StoredAlert>, StoreError> {
            self.inner.list_alerts().await
        }
    }

    fn handler<S, A>(snapshots: Arc<S>, alerts: Arc<A>) -> InsertionHandler
    where
        S: SnapshotStore + 'static,
        A: AlertStore + 'static,
    {
        InsertionHandler::new(
            snapshots,
            alerts,
            Arc::new(FixedClock::new(now())),
            DiffEngine::default(),
        )
    }

    fn event(id: SnapshotId) -> serde_json::Value {
        serde_json::json!({ "id": id.to_string() })
    }

    #[test]
    fn extract_rejects_bad_shapes() {
        for payload in [
            serde_json::json!("just a string"),
            serde_json::json!({}),
            serde_json::json!({"id": 42}),
            serde_json::json!({"id": "not-a-uuid"}),
        ] {
            assert!(matches!(
                extract_snapshot_id(&payload),
                Err(AlertServiceError::MalformedEvent(_))
            ));
        }
    }

    #[tokio::test]
    async fn malformed_event_contacts_no_store() {
        let snapshots = Arc::new(ScriptedSnapshots::default());
        let h = handler(Arc::clone(&snapshots), Arc::new(MemoryAlertStore::new()));

        let result = h.process(&serde_json::json!({"wrong": "field"})).await;
        assert!(matches!(result, Err(AlertServiceError::MalformedEvent(_))));
        assert_eq!(snapshots.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(snapshots.prior_lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn new_host_raises_new_server() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let alerts = Arc::new(MemoryAlertStore::new());
        let new = Snapshot::new("superhost1", now() - Duration::minutes(1));
        assert!(snapshots.insert_snapshot(&new).await.is_ok());

        let h = handler(snapshots, Arc::clone(&alerts));
        assert_eq!(h.process(&event(new.id)).await.ok(), Some(1));

        let Ok(stored) = alerts.list_alerts().await else {
            panic!("list failed");
        };
        let Some(first) = stored.first() else {
            panic!("expected an alert");
        };
        assert_eq!(first.alert.code(), AlertCode::NewServer);
        assert_eq!(
            first.alert.description,
            "The server 'superhost1' was added to the inventory"
        );
        assert_eq!(first.alert.date, now());
    }

    #[tokio::test]
    async fn prior_lookup_is_bounded_by_clock() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let alerts = Arc::new(MemoryAlertStore::new());
        let prior = Snapshot::new("superhost1", now() - Duration::hours(3))
            .with_database(Database::new("acd").with_feature("Driving", false));
        let new = Snapshot::new("superhost1", now() - Duration::hours(1))
            .with_database(Database::new("acd").with_feature("Driving", true));
        // Recorded after the clock reading: must not be picked as prior.
        let future = Snapshot::new("superhost1", now() + Duration::hours(1));
        for s in [&prior, &new, &future] {
            assert!(snapshots.insert_snapshot(s).await.is_ok());
        }

        let h = handler(snapshots, Arc::clone(&alerts));
        assert_eq!(h.process(&event(new.id)).await.ok(), Some(1));

        let Ok(stored) = alerts.list_alerts().await else {
            panic!("list failed");
        };
        assert_eq!(
            stored.first().map(|a| a.alert.payload.clone()),
            Some(AlertPayload::NewOption {
                hostname: "superhost1".to_string(),
                dbname: "acd".to_string(),
                features: vec!["Driving".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn fetch_failure_aborts_before_prior_lookup() {
        let snapshots = Arc::new(ScriptedSnapshots {
            fail_fetch: true,
            ..ScriptedSnapshots::default()
        });
        let alerts = Arc::new(MemoryAlertStore::new());
        let h = handler(Arc::clone(&snapshots), Arc::clone(&alerts));

        let result = h.process(&event(SnapshotId::new())).await;
        assert!(matches!(result, Err(AlertServiceError::Store(_))));
        assert_eq!(snapshots.prior_lookups.load(Ordering::SeqCst), 0);
        assert!(alerts.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_snapshot_is_not_found() {
        let h = handler(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(MemoryAlertStore::new()),
        );
        let result = h.process(&event(SnapshotId::new())).await;
        assert!(matches!(
            result,
            Err(AlertServiceError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn prior_lookup_failure_persists_nothing() {
        let snapshots = Arc::new(ScriptedSnapshots {
            fail_prior: true,
            ..ScriptedSnapshots::default()
        });
        let new = Snapshot::new("superhost1", now());
        assert!(snapshots.insert_snapshot(&new).await.is_ok());
        let alerts = Arc::new(MemoryAlertStore::new());
        let h = handler(snapshots, Arc::clone(&alerts));

        assert!(h.process(&event(new.id)).await.is_err());
        assert!(alerts.is_empty().await);
    }

    #[tokio::test]
    async fn first_insert_failure_stops_remaining_alerts() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let new = Snapshot::new("superhost1", now() - Duration::minutes(5))
            .with_database(Database::new("acd"));
        assert!(snapshots.insert_snapshot(&new).await.is_ok());
        let alerts = Arc::new(FailingAlerts {
            fail_on: 1,
            ..FailingAlerts::default()
        });
        let h = handler(snapshots, Arc::clone(&alerts));

        let result = h.process(&event(new.id)).await;
        assert!(matches!(result, Err(AlertServiceError::Store(_))));
        assert_eq!(alerts.attempts.load(Ordering::SeqCst), 1);
        assert!(alerts.inner.is_empty().await);
    }

    #[tokio::test]
    async fn later_insert_failure_keeps_earlier_alerts() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let new = Snapshot::new("superhost1", now() - Duration::minutes(5))
            .with_database(Database::new("acd"));
        assert!(snapshots.insert_snapshot(&new).await.is_ok());
        let alerts = Arc::new(FailingAlerts {
            fail_on: 2,
            ..FailingAlerts::default()
        });
        let h = handler(snapshots, Arc::clone(&alerts));

        assert!(h.process(&event(new.id)).await.is_err());
        assert_eq!(alerts.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(alerts.inner.len().await, 1);
    }

    #[tokio::test]
    async fn persisted_alerts_are_announced() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let new = Snapshot::new("superhost1", now() - Duration::minutes(1));
        assert!(snapshots.insert_snapshot(&new).await.is_ok());
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let h = handler(snapshots, Arc::new(MemoryAlertStore::new())).with_event_bus(bus);

        assert_eq!(h.process(&event(new.id)).await.ok(), Some(1));
        let Ok(BusEvent::AlertInserted {
            alert_id,
            alert_code,
            hostname,
        }) = rx.recv().await
        else {
            panic!("expected an alert announcement");
        };
        assert_eq!(alert_id, 1);
        assert_eq!(alert_code, AlertCode::NewServer);
        assert_eq!(hostname, "superhost1");
    }

    #[tokio::test]
    async fn handle_swallows_errors() {
        let h = handler(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(MemoryAlertStore::new()),
        );
        h.handle(&serde_json::json!(null)).await;
        h.handle(&event(SnapshotId::new())).await;
    }
}
