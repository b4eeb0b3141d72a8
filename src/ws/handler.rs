//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::EngineError;
use crate::service::room_service::lookup_id;

/// `GET /api/ws/{room_id}` — Subscribe to a room's live events.
///
/// # Errors
///
/// Returns [`EngineError::RoomNotFound`] if the room has no open channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let room_id = lookup_id(&room_id)?;
    let event_rx = state
        .hub
        .subscribe(&room_id)
        .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))?;

    Ok(ws.on_upgrade(move |socket| run_connection(socket, event_rx, room_id)))
}
