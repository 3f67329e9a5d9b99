//! # inventory-alerts
//!
//! Change detection and alerting for host and database inventory.
//!
//! Every time the ingestion pipeline records a new snapshot of a machine,
//! this service compares it with the machine's previous snapshot and raises
//! alerts for meaningful drift: a new machine, a new database, a newly used
//! license, or newly activated database features.
//!
//! ## Architecture
//!
//! ```text
//! Ingestion pipeline
//!     │  (Postgres NOTIFY, POST /api/v1/snapshots
//!     │   or POST /api/v1/events/hostdata-insertion)
//!     │
//!     ├── EventBus (domain/)
//!     ├── Worker (service/worker)
//!     │
//!     ├── InsertionHandler (service/)
//!     │     ├── SnapshotStore ──┐
//!     │     ├── DiffEngine      │ persistence/
//!     │     └── AlertStore ─────┘ (PostgreSQL or in-memory)
//!     │
//!     └── AlertInserted events back on the EventBus
//! ```

pub mod api;
pub mod app_state;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
