//! Request and response DTOs for the REST API.

pub mod event_dto;
pub mod snapshot_dto;

pub use event_dto::PublishResponse;
pub use snapshot_dto::{CreateSnapshotRequest, CreateSnapshotResponse};
