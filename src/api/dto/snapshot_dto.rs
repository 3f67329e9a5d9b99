//! DTOs for snapshot ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Database, Snapshot, SnapshotId};

/// Request body for `POST /api/v1/snapshots`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSnapshotRequest {
    /// Machine hostname.
    pub hostname: String,
    /// Recording time; defaults to the time of the request.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Databases observed on the machine.
    #[serde(default)]
    pub databases: Vec<Database>,
}

impl CreateSnapshotRequest {
    /// Builds a snapshot with a fresh id, stamping `now` if no time was given.
    #[must_use]
    pub fn into_snapshot(self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            id: SnapshotId::new(),
            hostname: self.hostname,
            created_at: self.created_at.unwrap_or(now),
            databases: self.databases,
        }
    }
}

/// Response body after a snapshot has been stored.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSnapshotResponse {
    /// Store-assigned snapshot id.
    pub id: SnapshotId,
    /// Machine hostname.
    pub hostname: String,
    /// Recording time.
    pub created_at: DateTime<Utc>,
    /// Number of bus subscribers notified of the insertion.
    pub delivered: usize,
}
