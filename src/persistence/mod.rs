//! Persistence layer: snapshot store and alert store.
//!
//! The alert engine only needs two narrow interfaces: [`SnapshotStore`] to
//! resolve a newly inserted snapshot and its predecessor, and
//! [`AlertStore`] to append alerts. Two backends implement them:
//! in-memory maps ([`memory`]) and PostgreSQL via `sqlx` ([`postgres`]).

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Alert, Snapshot, SnapshotId};
use crate::error::StoreError;
use models::StoredAlert;

pub use memory::{MemoryAlertStore, MemorySnapshotStore};
pub use postgres::{PostgresAlertStore, PostgresSnapshotStore};

/// Append-only store of machine snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync + Debug {
    /// Fetches a snapshot by identifier.
    ///
    /// # Errors
    ///
    /// * [`StoreError::NotFound`] - no snapshot with this id
    /// * [`StoreError::Query`] / [`StoreError::Decode`] - backend failure
    async fn fetch_by_id(&self, id: SnapshotId) -> Result<Snapshot, StoreError>;

    /// Fetches the snapshot of `hostname` with the greatest `created_at`
    /// strictly before `before`. `Ok(None)` means the machine has no
    /// history yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn fetch_most_recent_before(
        &self,
        hostname: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError>;

    /// Stores a new snapshot. Used by ingestion tooling.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError>;
}

/// Append-only store of alerts.
#[async_trait]
pub trait AlertStore: Send + Sync + Debug {
    /// Persists an alert and returns its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn insert(&self, alert: &Alert) -> Result<i64, StoreError>;

    /// Lists stored alerts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn list_alerts(&self) -> Result<Vec<StoredAlert>, StoreError>;
}
