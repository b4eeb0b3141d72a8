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
    status: String,
    timestamp: String,
    version: String,
    open_rooms: usize,
    journal_enabled: bool,
}

/// `GET /api/health` — Service health status.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, open room channels and whether the journal is attached.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_rooms: state.hub.room_count(),
            journal_enabled: state.hub.journal().is_enabled(),
        }),
    )
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
