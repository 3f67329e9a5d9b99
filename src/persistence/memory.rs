//! In-memory store backends.
//!
//! Snapshots live in a `RwLock<HashMap<...>>` keyed by id; alerts in an
//! append-only `RwLock<Vec<...>>`. Used by tests and by deployments run
//! with `STORE_BACKEND=memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::StoredAlert;
use super::{AlertStore, SnapshotStore};
use crate::domain::{Alert, Snapshot, SnapshotId};
use crate::error::StoreError;

/// Snapshot store backed by a hash map.
///
/// # Concurrency
///
/// Lookups take the read lock and may run concurrently; inserts are
/// serialized by the write lock.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<SnapshotId, Snapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Returns `true` if no snapshot is stored.
    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn fetch_by_id(&self, id: SnapshotId) -> Result<Snapshot, StoreError> {
        let map = self.snapshots.read().await;
        map.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::snapshot_not_found(id))
    }

    async fn fetch_most_recent_before(
        &self,
        hostname: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError> {
        let map = self.snapshots.read().await;
        Ok(map
            .values()
            .filter(|s| s.hostname == hostname && s.created_at < before)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError> {
        let mut map = self.snapshots.write().await;
        if map.contains_key(&snapshot.id) {
            return Err(StoreError::Query(format!(
                "snapshot {} already exists",
                snapshot.id
            )));
        }
        map.insert(snapshot.id, snapshot.clone());
        Ok(snapshot.id)
    }
}

/// Alert store backed by a vector; ids are positions starting at 1.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<StoredAlert>>,
}

impl MemoryAlertStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored alerts.
    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    /// Returns `true` if no alert is stored.
    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn insert(&self, alert: &Alert) -> Result<i64, StoreError> {
        let mut alerts = self.alerts.write().await;
        let id = i64::try_from(alerts.len())
            .map_err(|e| StoreError::Query(e.to_string()))?
            .saturating_add(1);
        alerts.push(StoredAlert {
            id,
            alert: alert.clone(),
        });
        Ok(id)
    }

    async fn list_alerts(&self) -> Result<Vec<StoredAlert>, StoreError> {
        Ok(self.alerts.read().await.clone())
    }
}
