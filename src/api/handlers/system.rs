//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when the ledger store answers, `degraded` otherwise.
    status: &'static str,
    /// `up` or `down`.
    database: &'static str,
    /// RFC 3339 time of the check.
    checked_at: String,
}

/// `GET /health`: Ledger store reachability.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Round-trips to the ledger store. Reports 503 with status `degraded` when the store does not answer.",
    responses(
        (status = 200, description = "Ledger store reachable", body = HealthResponse),
        (status = 503, description = "Ledger store unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status, database) = match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy", "up"),
        Err(e) => {
            tracing::warn!(error = %e, "ledger store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            database,
            checked_at: Utc::now().to_rfc3339(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
