//! Domain layer: snapshots, alerts, change classification and events.
//!
//! This module contains the inventory model (machine snapshots and the
//! databases they host), the alert records derived from it, the feature
//! transition classifier, the qualifying-license predicate and the event
//! bus that connects ingestion to alert generation.

pub mod alert;
pub mod event_bus;
pub mod feature_diff;
pub mod license;
pub mod snapshot;

pub use alert::{Alert, AlertCode, AlertPayload, AlertSeverity, AlertStatus};
pub use event_bus::{BusEvent, EventBus};
pub use feature_diff::{FeatureDiff, FeatureTransition, diff_features};
pub use license::LicenseRule;
pub use snapshot::{Database, Feature, License, Snapshot, SnapshotId};
