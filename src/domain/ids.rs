//! Type-safe participant and poll identifiers, plus the participant token.
//!
//! [`ParticipantId`] and [`PollId`] wrap UUID v4 values so the two can never
//! be confused with each other. [`ParticipantToken`] is the opaque bearer
//! credential handed to a joining client.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Defines a UUID v4 newtype identifier with the usual conversions.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a participant. Generated on join.
    ParticipantId
);

uuid_id!(
    /// Unique identifier for a poll. Generated on poll creation.
    PollId
);

/// Number of random bytes behind a participant token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Opaque, unguessable credential identifying a participant on vote calls.
///
/// The token is the only thing a client presents when voting; it is never
/// included in broadcasts, listings, or logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantToken(String);

impl ParticipantToken {
    /// Generates a fresh token from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps a token string presented by a client.
    #[must_use]
    pub fn from_presented(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; keep them out of debug output.
impl fmt::Debug for ParticipantToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParticipantToken(***)")
    }
}
