//! inventory-alerts server entry point.
//!
//! Wires the stores, the diff engine and the event bus together, starts the
//! alert worker and serves the health/ingress HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use inventory_alerts::api;
use inventory_alerts::app_state::AppState;
use inventory_alerts::clock::SystemClock;
use inventory_alerts::config::{LogFormat, ServiceConfig, StoreBackend};
use inventory_alerts::domain::EventBus;
use inventory_alerts::persistence::postgres::forward_notifications;
use inventory_alerts::persistence::{
    AlertStore, MemoryAlertStore, MemorySnapshotStore, PostgresAlertStore, PostgresSnapshotStore,
    SnapshotStore,
};
use inventory_alerts::service::{DiffEngine, InsertionHandler, worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.store_backend, "starting inventory-alerts");

    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build persistence layer
    let (snapshots, alerts, announce_snapshots) = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await?;
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("database migrations applied");

            let listener_pool = pool.clone();
            let channel = config.notify_channel.clone();
            let bus = event_bus.clone();
            tokio::spawn(async move {
                if let Err(error) = forward_notifications(&listener_pool, &channel, bus).await {
                    tracing::error!(%error, "notification listener stopped");
                }
            });

            let snapshots: Arc<dyn SnapshotStore> =
                Arc::new(PostgresSnapshotStore::new(pool.clone()));
            let alerts: Arc<dyn AlertStore> = Arc::new(PostgresAlertStore::new(pool));
            (snapshots, alerts, false)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory stores; snapshots and alerts are not durable");
            let snapshots: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
            let alerts: Arc<dyn AlertStore> = Arc::new(MemoryAlertStore::new());
            (snapshots, alerts, true)
        }
    };

    // Build service layer
    let handler = Arc::new(
        InsertionHandler::new(
            Arc::clone(&snapshots),
            alerts,
            Arc::new(SystemClock),
            DiffEngine::new(config.license_rule.clone()),
        )
        .with_event_bus(event_bus.clone()),
    );
    let _worker = worker::spawn(&event_bus, handler);

    // Build router
    let app_state = AppState {
        snapshots,
        event_bus,
        announce_snapshots,
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
