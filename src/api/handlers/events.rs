//! Event ingress: lets ingestion pipelines announce snapshot insertions
//! over HTTP instead of Postgres `NOTIFY`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::PublishResponse;
use crate::app_state::AppState;
use crate::domain::BusEvent;
use crate::domain::event_bus::TOPIC_HOSTDATA_INSERTION;
use crate::error::AlertServiceError;

/// `POST /events/hostdata-insertion`: Publish a snapshot insertion.
///
/// The body is forwarded to the bus as-is; validation of the `id` field
/// happens in the alert worker, which drops malformed events.
///
/// # Errors
///
/// Returns [`AlertServiceError::NoSubscribers`] when no worker is
/// listening on the bus.
pub async fn publish_hostdata_insertion(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AlertServiceError> {
    let delivered = state
        .event_bus
        .publish(BusEvent::HostDataInserted { payload });
    if delivered == 0 {
        return Err(AlertServiceError::NoSubscribers);
    }

    tracing::debug!(delivered, "insertion event published");
    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            topic: TOPIC_HOSTDATA_INSERTION,
            delivered,
        }),
    ))
}

/// Event routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/events/hostdata-insertion",
        post(publish_hostdata_insertion),
    )
}
