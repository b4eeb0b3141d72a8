//! WebSocket connection loop.
//!
//! Forwards a room's events to one client and answers its control frames.
//! The loop ends when the client leaves, falls too far behind, or the
//! room is purged.

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ServerFrame, reply_to};
use crate::domain::{RoomEvent, RoomId};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Replies to client frames (`ping`, or an `error` for anything else).
/// - Forwards every [`RoomEvent`] from the room's channel.
/// - A lagging client is closed with code 1013 so it reconnects and
///   re-fetches state over HTTP.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<RoomEvent>,
    room_id: RoomId,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    tracing::debug!(%room_id, "ws subscriber connected");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(reply) = encode(&reply_to(text.as_str())) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(reply)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        let Some(json) = encode(&event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%room_id, skipped, "ws subscriber lagged, disconnecting");
                        let _ = ws_tx.send(close(close_code::AGAIN, "lagged behind, re-fetch state")).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        let _ = ws_tx.send(close(close_code::NORMAL, "room closed")).await;
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(%room_id, "ws connection closed");
}

fn close(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

fn encode<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value)
        .inspect_err(|e| tracing::warn!(error = %e, "failed to encode ws frame"))
        .ok()
}
