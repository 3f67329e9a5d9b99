//! System endpoints: health check and alert code catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::domain::{AlertCode, AlertSeverity};

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Alert code info.
#[derive(Debug, Serialize)]
struct AlertCodeInfo {
    alert_code: AlertCode,
    severity: AlertSeverity,
    description: &'static str,
    fields: &'static [&'static str],
}

/// `GET /config/alert-codes`: List the alert codes this service raises.
pub async fn alert_codes_handler() -> impl IntoResponse {
    let codes = [
        (
            AlertCode::NewServer,
            "A machine was observed for the first time",
            &["hostname"][..],
        ),
        (
            AlertCode::NewDatabase,
            "A database appeared on a known or new machine",
            &["hostname", "dbname"][..],
        ),
        (
            AlertCode::NewLicense,
            "A database on the machine started using a qualifying license",
            &["hostname"][..],
        ),
        (
            AlertCode::NewOption,
            "Features were activated on a database (baseline for new databases)",
            &["hostname", "dbname", "features"][..],
        ),
    ]
    .into_iter()
    .map(|(alert_code, description, fields)| AlertCodeInfo {
        alert_code,
        severity: alert_code.severity(),
        description,
        fields,
    })
    .collect::<Vec<_>>();
    (StatusCode::OK, Json(codes))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/alert-codes", get(alert_codes_handler))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::EventBus;
    use crate::persistence::MemorySnapshotStore;

    #[tokio::test]
    async fn health_is_ok() {
        let app = routes().with_state(AppState {
            snapshots: Arc::new(MemorySnapshotStore::new()),
            event_bus: EventBus::new(4),
            announce_snapshots: true,
        });
        let Ok(req) = Request::builder().uri("/health").body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = app.oneshot(req).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::OK);
    }
}
