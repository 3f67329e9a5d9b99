//! Bus consumer driving the insertion handler.
//!
//! Subscribes to the [`EventBus`] and spawns one task per
//! [`BusEvent::HostDataInserted`], so slow store calls for one machine do
//! not hold up events for others.

use std::sync::Arc;

use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::InsertionHandler;
use crate::domain::{BusEvent, EventBus};

/// Subscribes to `bus` and spawns the consumer loop.
///
/// The subscription is taken before this function returns, so events
/// published afterwards are never missed.
#[must_use]
pub fn spawn(bus: &EventBus, handler: Arc<InsertionHandler>) -> JoinHandle<()> {
    let rx = bus.subscribe();
    tokio::spawn(run(rx, handler))
}

/// Consumes insertion events until the bus is closed.
///
/// The bus closes only once every [`EventBus`] clone is dropped. A
/// handler built with [`InsertionHandler::with_event_bus`] holds one, so
/// in that setup the loop runs for the life of the process.
///
/// Lagging behind the channel capacity drops the oldest events; that is
/// logged and consumption continues. Other topics are ignored.
pub async fn run(mut rx: Receiver<BusEvent>, handler: Arc<InsertionHandler>) {
    loop {
        match rx.recv().await {
            Ok(BusEvent::HostDataInserted { payload }) => {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    handler.handle(&payload).await;
                });
            }
            Ok(BusEvent::AlertInserted { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "alert worker lagged; insertion events dropped");
            }
            Err(RecvError::Closed) => {
                tracing::info!("event bus closed; alert worker stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::clock::SystemClock;
    use crate::domain::{AlertCode, AlertPayload, Database, LicenseRule, Snapshot};
    use crate::persistence::{
        AlertStore, MemoryAlertStore, MemorySnapshotStore, SnapshotStore,
    };
    use crate::service::DiffEngine;

    /// Waits for `count` alert announcements, skipping other topics.
    async fn await_alerts(rx: &mut Receiver<BusEvent>, count: usize) -> Vec<AlertCode> {
        let mut codes = Vec::new();
        while codes.len() < count {
            let Ok(received) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await
            else {
                panic!("timed out waiting for alerts, got {codes:?}");
            };
            match received {
                Ok(BusEvent::AlertInserted { alert_code, .. }) => codes.push(alert_code),
                Ok(BusEvent::HostDataInserted { .. }) => {}
                Err(error) => panic!("bus error: {error}"),
            }
        }
        codes
    }

    #[tokio::test]
    async fn pipeline_raises_alerts_across_snapshots() {
        let bus = EventBus::new(64);
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let alerts = Arc::new(MemoryAlertStore::new());
        let handler = Arc::new(
            InsertionHandler::new(
                Arc::clone(&snapshots) as Arc<dyn SnapshotStore>,
                Arc::clone(&alerts) as Arc<dyn AlertStore>,
                Arc::new(SystemClock),
                DiffEngine::new(LicenseRule::default()),
            )
            .with_event_bus(bus.clone()),
        );
        let _worker = spawn(&bus, handler);
        let mut rx = bus.subscribe();

        let start = Utc::now() - chrono::Duration::hours(3);
        let steps = [
            Snapshot::new("superhost1", start),
            Snapshot::new("superhost1", start + chrono::Duration::hours(1)).with_database(
                Database::new("acd")
                    .with_license("Oracle ENT", false)
                    .with_feature("Driving", false),
            ),
            Snapshot::new("superhost1", start + chrono::Duration::hours(2)).with_database(
                Database::new("acd")
                    .with_license("Oracle ENT", true)
                    .with_feature("Driving", true),
            ),
        ];
        let expected: [&[AlertCode]; 3] = [
            &[AlertCode::NewServer],
            &[AlertCode::NewDatabase, AlertCode::NewOption],
            &[AlertCode::NewLicense, AlertCode::NewOption],
        ];

        for (snapshot, codes) in steps.iter().zip(expected) {
            let Ok(id) = snapshots.insert_snapshot(snapshot).await else {
                panic!("insert failed");
            };
            assert!(bus.publish(BusEvent::hostdata_inserted(id)) >= 1);
            assert_eq!(await_alerts(&mut rx, codes.len()).await, codes);
        }

        let Ok(stored) = alerts.list_alerts().await else {
            panic!("list failed");
        };
        assert_eq!(stored.len(), 5);
        let Some(last) = stored.last() else {
            panic!("no alerts stored");
        };
        let AlertPayload::NewOption { features, .. } = &last.alert.payload else {
            panic!("expected NewOption, got {:?}", last.alert.payload);
        };
        assert_eq!(features, &vec!["Driving".to_string()]);
    }

    #[tokio::test]
    async fn malformed_event_raises_nothing() {
        let bus = EventBus::new(16);
        let alerts = Arc::new(MemoryAlertStore::new());
        let handler = Arc::new(InsertionHandler::new(
            Arc::new(MemorySnapshotStore::new()),
            Arc::clone(&alerts) as Arc<dyn AlertStore>,
            Arc::new(SystemClock),
            DiffEngine::new(LicenseRule::default()),
        ));
        let worker = spawn(&bus, handler);

        bus.publish(BusEvent::HostDataInserted {
            payload: serde_json::json!({"hostname": "superhost1"}),
        });
        drop(bus);

        let Ok(Ok(())) = tokio::time::timeout(Duration::from_secs(5), worker).await else {
            panic!("worker did not stop after the bus closed");
        };
        tokio::task::yield_now().await;
        assert!(alerts.is_empty().await);
    }
}
