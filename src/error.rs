//! Service error types with HTTP status code mapping.
//!
//! [`RewardsError`] is the central error type. Each variant maps to a
//! numeric code, an HTTP status, and a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "duplicate reward event: reference_id r1 already exists",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                  |
/// |-----------|----------------------|------------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request              |
/// | 2000–2999 | Not Found / Conflict | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server               | 500 / 502                    |
#[derive(Debug, thiserror::Error)]
pub enum RewardsError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A user id could not be parsed as a UUID.
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    /// The user does not exist or is soft-deleted.
    #[error("user not found")]
    UserNotFound(uuid::Uuid),

    /// A non-deleted reward with the same reference id already exists.
    #[error("duplicate reward event: reference_id {0} already exists")]
    DuplicateReward(String),

    /// No stored price for the symbol on that day and the live fallback is off.
    #[error("no historical price for {symbol} on {date}")]
    HistoryUnavailable {
        /// Stock symbol.
        symbol: String,
        /// Requested day.
        date: NaiveDate,
    },

    /// Database I/O failed; nothing was committed.
    #[error("store error: {0}")]
    Store(StoreError),

    /// The price oracle could not produce a quote.
    #[error("price oracle error: {0}")]
    Oracle(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RewardsError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidUserId(_) => 1002,
            Self::UserNotFound(_) => 2001,
            Self::DuplicateReward(_) => 2002,
            Self::HistoryUnavailable { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::Store(_) => 3001,
            Self::Oracle(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::HistoryUnavailable { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateReward(_) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Oracle(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for RewardsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateReference(reference_id) => Self::DuplicateReward(reference_id),
            other => Self::Store(other),
        }
    }
}

impl IntoResponse for RewardsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let details = match &self {
            Self::UserNotFound(id) => Some(id.to_string()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(
            RewardsError::InvalidUserId("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RewardsError::UserNotFound(uuid::Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RewardsError::DuplicateReward("r1".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RewardsError::Store(StoreError::Corrupt("bad".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_reference_becomes_conflict() {
        let err = RewardsError::from(StoreError::DuplicateReference("r9".to_string()));
        assert!(matches!(err, RewardsError::DuplicateReward(ref r) if r == "r9"));
        assert_eq!(err.error_code(), 2002);
    }

    #[test]
    fn other_store_errors_are_transient() {
        let err = RewardsError::from(StoreError::Corrupt("row".to_string()));
        assert!(matches!(err, RewardsError::Store(_)));
    }

    #[test]
    fn user_not_found_message_is_stable() {
        assert_eq!(
            RewardsError::UserNotFound(uuid::Uuid::nil()).to_string(),
            "user not found"
        );
    }

    #[tokio::test]
    async fn response_carries_code_and_status() {
        let response = RewardsError::DuplicateReward("r1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let Ok(bytes) = axum::body::to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("body should be readable");
        };
        let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            panic!("body should be json");
        };
        assert_eq!(json["error"]["code"], 2002);
    }
}
