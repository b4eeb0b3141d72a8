//! Events emitted for every accepted room or poll mutation.
//!
//! Every mutation publishes a [`RoomEvent`] through the
//! [`super::BroadcastHub`]. The serialized form is the `{type, ...payload}`
//! envelope pushed to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::room::RoomStatus;
use super::vote_ledger::Tally;
use super::{ParticipantId, PollId, RoomId};

/// Domain event broadcast to a room's subscribers.
///
/// Payloads carry tallies only; no event ever links a participant to a
/// choice.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Participant counters changed (join, approve, deny).
    ParticipantUpdate {
        /// Room identifier.
        room_id: RoomId,
        /// All participants.
        participant_count: usize,
        /// Approved participants.
        approved_count: usize,
        /// Pending participants.
        pending_count: usize,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A participant was approved.
    ParticipantApproved {
        /// Room identifier.
        room_id: RoomId,
        /// Approved participant.
        participant_id: ParticipantId,
        /// Participant display name.
        display_name: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A participant was denied.
    ParticipantDenied {
        /// Room identifier.
        room_id: RoomId,
        /// Denied participant.
        participant_id: ParticipantId,
        /// Participant display name.
        display_name: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A poll started accepting votes.
    PollStarted {
        /// Room identifier.
        room_id: RoomId,
        /// Poll identifier.
        poll_id: PollId,
        /// Question text.
        question: String,
        /// Options in display order.
        options: Vec<String>,
        /// Optional timer in minutes.
        timer_minutes: Option<f64>,
        /// Auto-stop deadline, if timed.
        closes_at: Option<DateTime<Utc>>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The organizer stopped a poll.
    PollStopped {
        /// Room identifier.
        room_id: RoomId,
        /// Poll identifier.
        poll_id: PollId,
        /// Final counts.
        vote_counts: Tally,
        /// Final total.
        total_votes: u64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A poll's timer expired and closed it.
    PollAutoStopped {
        /// Room identifier.
        room_id: RoomId,
        /// Poll identifier.
        poll_id: PollId,
        /// Final counts.
        vote_counts: Tally,
        /// Final total.
        total_votes: u64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A vote was accepted.
    VoteUpdate {
        /// Room identifier.
        room_id: RoomId,
        /// Poll identifier.
        poll_id: PollId,
        /// Fresh counts.
        vote_counts: Tally,
        /// Fresh total.
        total_votes: u64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RoomEvent {
    /// Builds a `participant_update` from a status snapshot.
    #[must_use]
    pub fn participant_update(status: &RoomStatus) -> Self {
        Self::ParticipantUpdate {
            room_id: status.room_id.clone(),
            participant_count: status.participant_count,
            approved_count: status.approved_count,
            pending_count: status.pending_count,
            timestamp: Utc::now(),
        }
    }

    /// Returns the room this event belongs to.
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::ParticipantUpdate { room_id, .. }
            | Self::ParticipantApproved { room_id, .. }
            | Self::ParticipantDenied { room_id, .. }
            | Self::PollStarted { room_id, .. }
            | Self::PollStopped { room_id, .. }
            | Self::PollAutoStopped { room_id, .. }
            | Self::VoteUpdate { room_id, .. } => room_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ParticipantUpdate { .. } => "participant_update",
            Self::ParticipantApproved { .. } => "participant_approved",
            Self::ParticipantDenied { .. } => "participant_denied",
            Self::PollStarted { .. } => "poll_started",
            Self::PollStopped { .. } => "poll_stopped",
            Self::PollAutoStopped { .. } => "poll_auto_stopped",
            Self::VoteUpdate { .. } => "vote_update",
        }
    }
}
