//! WebSocket layer: live room event subscriptions.
//!
//! `GET /api/ws/{room_id}` upgrades to a WebSocket that receives every
//! event of that room as a `{type, ...payload}` JSON text frame.

pub mod connection;
pub mod handler;
pub mod messages;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// WebSocket routes, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/{room_id}", get(handler::ws_handler))
}
