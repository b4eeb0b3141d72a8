//! WebSocket control frames.
//!
//! Room events go out as their own `{type, ...payload}` envelope (see
//! [`crate::domain::RoomEvent`]). The frames here are the few control
//! messages exchanged besides them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Keep-alive probe; answered with [`ServerFrame::Pong`].
    Ping,
}

/// Control frames the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Reply to a ping.
    Pong {
        /// Server time.
        timestamp: DateTime<Utc>,
    },
    /// The client sent something the server does not understand.
    Error {
        /// HTTP-like status code.
        code: u16,
        /// Human-readable reason.
        message: String,
    },
}

/// Decodes a client text frame and builds the reply to send back.
#[must_use]
pub fn reply_to(text: &str) -> ServerFrame {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Ping) => ServerFrame::Pong {
            timestamp: Utc::now(),
        },
        Err(e) => ServerFrame::Error {
            code: 400,
            message: format!("unsupported frame: {e}"),
        },
    }
}
