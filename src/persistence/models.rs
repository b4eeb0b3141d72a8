//! Journal row models.

use chrono::{DateTime, Utc};

use crate::domain::{RoomEvent, RoomId};

/// An entry waiting to be written to the journal.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    /// Room that produced the event.
    pub room_id: RoomId,
    /// Event type discriminator (e.g. `"vote_update"`).
    pub event_type: &'static str,
    /// Serialized event envelope.
    pub payload: serde_json::Value,
    /// When the event was accepted.
    pub recorded_at: DateTime<Utc>,
}

impl NewJournalEntry {
    /// Encodes a broadcast event as a journal entry.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the event cannot be serialized.
    pub fn from_event(event: &RoomEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            room_id: event.room_id().clone(),
            event_type: event.event_type_str(),
            payload: serde_json::to_value(event)?,
            recorded_at: Utc::now(),
        })
    }
}
