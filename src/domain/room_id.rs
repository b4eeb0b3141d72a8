//! Room identifier policy.
//!
//! A [`RoomId`] is 3–10 ASCII alphanumeric characters, stored uppercase.
//! Organizers may pick a custom id, otherwise a random six-character id is
//! generated. Uniqueness is enforced by the room registry under its index
//! lock, not here.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Minimum length of a room id.
pub const MIN_ROOM_ID_LEN: usize = 3;

/// Maximum length of a room id.
pub const MAX_ROOM_ID_LEN: usize = 10;

/// Length of a generated room id.
pub const GENERATED_ROOM_ID_LEN: usize = 6;

const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Case-folded room identifier.
///
/// Two ids that differ only by case are the same room: `"ab1"` and `"AB1"`
/// both parse to `AB1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Validates a custom room id and folds it to uppercase.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRoomId`] unless the trimmed input is
    /// 3–10 characters long and entirely ASCII alphanumeric.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if !(MIN_ROOM_ID_LEN..=MAX_ROOM_ID_LEN).contains(&len) {
            return Err(EngineError::InvalidRoomId(format!(
                "room id must be {MIN_ROOM_ID_LEN}-{MAX_ROOM_ID_LEN} characters, got {len}"
            )));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EngineError::InvalidRoomId(format!(
                "room id must be alphanumeric: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Generates a random six-character uppercase alphanumeric id.
    ///
    /// The caller is responsible for checking it against existing rooms.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id: String = (0..GENERATED_ROOM_ID_LEN)
            .filter_map(|_| ROOM_ID_ALPHABET.choose(&mut *rng).copied().map(char::from))
            .collect();
        Self(id)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
