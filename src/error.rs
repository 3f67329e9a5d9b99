//! Service error types with HTTP status code mapping.
//!
//! Three layers of errors:
//!
//! - [`StoreError`]: snapshot/alert store failures (fetch or insert).
//! - [`DiffError`]: malformed snapshots handed to the diff engine.
//! - [`AlertServiceError`]: the central error type of the service. Each
//!   variant maps to a numeric code and, for the HTTP surface, a status
//!   code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "malformed event: missing `id` field",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure reported by a snapshot or alert store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("not found: {entity} with id {id}")]
    NotFound {
        /// Kind of record (e.g. `"snapshot"`).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Query or connection failure.
    #[error("query failed: {0}")]
    Query(String),

    /// A stored row could not be decoded into a domain value.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl StoreError {
    /// Builds a [`StoreError::NotFound`] for a snapshot id.
    #[must_use]
    pub fn snapshot_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "snapshot",
            id: id.to_string(),
        }
    }
}

/// Caller contract violation detected by the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// A database name occurs more than once within one snapshot.
    #[error("duplicate database '{dbname}' in snapshot of host '{hostname}'")]
    DuplicateDatabase {
        /// Machine the snapshot belongs to.
        hostname: String,
        /// Repeated database name.
        dbname: String,
    },
}

/// Service-level error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                 |
/// |-----------|-----------------|-----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request             |
/// | 2000–2999 | Not Found       | 404 Not Found               |
/// | 3000–3999 | Server          | 500 / 503                   |
/// | 4000–4999 | Data Contract   | 422 Unprocessable Entity    |
#[derive(Debug, thiserror::Error)]
pub enum AlertServiceError {
    /// The insertion event lacks a usable snapshot identifier.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The request body is semantically invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Snapshot or alert store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Snapshot data violates the diff engine's input contract.
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// No worker is subscribed to receive published events.
    #[error("no subscriber is listening for events")]
    NoSubscribers,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AlertServiceError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedEvent(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::Store(StoreError::NotFound { .. }) => 2001,
            Self::Store(StoreError::Query(_)) => 3001,
            Self::Store(StoreError::Decode(_)) => 3002,
            Self::NoSubscribers => 3003,
            Self::Internal(_) => 3000,
            Self::Diff(DiffError::DuplicateDatabase { .. }) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedEvent(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoSubscribers => StatusCode::SERVICE_UNAVAILABLE,
            Self::Diff(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AlertServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
