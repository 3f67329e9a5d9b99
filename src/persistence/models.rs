//! Database models for snapshots and alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Alert, Database, Snapshot, SnapshotId};
use crate::error::StoreError;

/// A row from the `hosts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    /// Snapshot identifier.
    pub id: Uuid,
    /// Machine hostname.
    pub hostname: String,
    /// Recording timestamp.
    pub created_at: DateTime<Utc>,
    /// Database observations as JSONB.
    pub databases: serde_json::Value,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let databases: Vec<Database> = serde_json::from_value(row.databases)
            .map_err(|e| StoreError::Decode(format!("snapshot {}: {e}", row.id)))?;
        Ok(Self {
            id: SnapshotId::from_uuid(row.id),
            hostname: row.hostname,
            created_at: row.created_at,
            databases,
        })
    }
}

/// An alert together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAlert {
    /// Auto-increment row ID.
    pub id: i64,
    /// The alert as generated.
    #[serde(flatten)]
    pub alert: Alert,
}
