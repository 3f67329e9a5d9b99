//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::persistence::SnapshotStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Snapshot store the ingestion endpoint writes to.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Event bus the ingress endpoints publish insertion events to.
    pub event_bus: EventBus,
    /// Whether the ingestion endpoint publishes insertion events itself.
    /// `false` when the store announces inserts on its own (Postgres
    /// `NOTIFY` trigger).
    pub announce_snapshots: bool,
}
