//! Snapshot ingestion: store a snapshot and announce its insertion.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{CreateSnapshotRequest, CreateSnapshotResponse};
use crate::app_state::AppState;
use crate::domain::BusEvent;
use crate::error::AlertServiceError;

/// `POST /snapshots`: Record a machine snapshot.
///
/// Stores the snapshot, then publishes a `hostdata.insertion` event with
/// its id so the alert worker diffs it against the machine's history.
/// Stores that announce inserts themselves skip the publish, and
/// `delivered` is then 0.
///
/// # Errors
///
/// Returns [`AlertServiceError::InvalidRequest`] for an empty hostname
/// and [`AlertServiceError::Store`] if the snapshot cannot be stored.
pub async fn create_snapshot(
    State(state): State<AppState>,
    Json(req): Json<CreateSnapshotRequest>,
) -> Result<impl IntoResponse, AlertServiceError> {
    if req.hostname.trim().is_empty() {
        return Err(AlertServiceError::InvalidRequest(
            "hostname must not be empty".to_string(),
        ));
    }

    let snapshot = req.into_snapshot(Utc::now());
    let id = state.snapshots.insert_snapshot(&snapshot).await?;
    let delivered = if state.announce_snapshots {
        state.event_bus.publish(BusEvent::hostdata_inserted(id))
    } else {
        0
    };

    tracing::info!(snapshot_id = %id, hostname = %snapshot.hostname, delivered, "snapshot recorded");
    Ok((
        StatusCode::CREATED,
        Json(CreateSnapshotResponse {
            id,
            hostname: snapshot.hostname,
            created_at: snapshot.created_at,
            delivered,
        }),
    ))
}

/// Snapshot routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/snapshots", post(create_snapshot))
}
