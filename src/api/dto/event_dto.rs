//! DTOs for the event ingress endpoint.

use serde::Serialize;

/// Response body of `POST /api/v1/events/hostdata-insertion`.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    /// Topic the event was published on.
    pub topic: &'static str,
    /// Number of bus subscribers that received the event.
    pub delivered: usize,
}
