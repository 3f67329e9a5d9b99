//! PostgreSQL implementation of the persistence layer.
//!
//! Tables are created by the migrations in `migrations/`. Snapshot
//! databases are stored as JSONB; alerts keep their `other_info` object as
//! JSONB so consumers can query `other_info->>'hostname'` directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgListener;

use super::models::{SnapshotRow, StoredAlert};
use super::{AlertStore, SnapshotStore};
use crate::domain::{Alert, AlertPayload, BusEvent, EventBus, Snapshot, SnapshotId};
use crate::error::StoreError;

fn query_error(e: sqlx::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

/// PostgreSQL-backed snapshot store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Creates a new snapshot store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn fetch_by_id(&self, id: SnapshotId) -> Result<Snapshot, StoreError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, hostname, created_at, databases FROM hosts WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?
        .ok_or_else(|| StoreError::snapshot_not_found(id))?;

        Snapshot::try_from(row)
    }

    async fn fetch_most_recent_before(
        &self,
        hostname: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, hostname, created_at, databases FROM hosts \
             WHERE hostname = $1 AND created_at < $2 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(hostname)
        .bind(before)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(Snapshot::try_from).transpose()
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError> {
        let databases = serde_json::to_value(&snapshot.databases)
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        sqlx::query("INSERT INTO hosts (id, hostname, created_at, databases) VALUES ($1, $2, $3, $4)")
            .bind(*snapshot.id.as_uuid())
            .bind(&snapshot.hostname)
            .bind(snapshot.created_at)
            .bind(databases)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(snapshot.id)
    }
}

/// PostgreSQL-backed alert store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresAlertStore {
    pool: PgPool,
}

impl PostgresAlertStore {
    /// Creates a new alert store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PostgresAlertStore {
    async fn insert(&self, alert: &Alert) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO alerts (alert_code, severity, status, description, date, other_info) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(alert.code().as_str())
        .bind(alert.severity.as_str())
        .bind(alert.status.as_str())
        .bind(&alert.description)
        .bind(alert.date)
        .bind(alert.payload.other_info())
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn list_alerts(&self) -> Result<Vec<StoredAlert>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, String, DateTime<Utc>, serde_json::Value)>(
            "SELECT id, alert_code, severity, status, description, date, other_info \
             FROM alerts ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        rows.into_iter()
            .map(
                |(id, alert_code, severity, status, description, date, other_info)| {
                    let payload = decode_payload(&alert_code, other_info)?;
                    Ok(StoredAlert {
                        id,
                        alert: Alert {
                            payload,
                            severity: decode_text(&severity)?,
                            status: decode_text(&status)?,
                            description,
                            date,
                        },
                    })
                },
            )
            .collect()
    }
}

/// Rebuilds a tagged payload from the `alert_code` and `other_info` columns.
fn decode_payload(
    alert_code: &str,
    other_info: serde_json::Value,
) -> Result<AlertPayload, StoreError> {
    serde_json::from_value(serde_json::json!({
        "alert_code": alert_code,
        "other_info": other_info,
    }))
    .map_err(|e| StoreError::Decode(format!("alert payload ({alert_code}): {e}")))
}

/// Decodes a unit enum stored as its wire name (`"NOTICE"`, `"NEW"`, ...).
fn decode_text<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|e| StoreError::Decode(format!("unexpected value {text:?}: {e}")))
}

/// Forwards `NOTIFY` payloads on `channel` to the bus as
/// [`BusEvent::HostDataInserted`].
///
/// The ingestion pipeline sends `NOTIFY <channel>, '{"id": "<uuid>"}'`
/// after storing a snapshot. Payloads that are not JSON are forwarded as a
/// JSON string so the handler drops them as malformed. Runs until the
/// listener connection fails.
///
/// # Errors
///
/// Returns a [`StoreError::Query`] if listening fails or the connection
/// is lost.
pub async fn forward_notifications(
    pool: &PgPool,
    channel: &str,
    bus: EventBus,
) -> Result<(), StoreError> {
    let mut listener = PgListener::connect_with(pool).await.map_err(query_error)?;
    listener.listen(channel).await.map_err(query_error)?;
    tracing::info!(channel, "listening for snapshot insertions");

    loop {
        let notification = listener.recv().await.map_err(query_error)?;
        let raw = notification.payload();
        let payload = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        let delivered = bus.publish(BusEvent::HostDataInserted { payload });
        tracing::debug!(channel, delivered, "notification forwarded");
    }
}
