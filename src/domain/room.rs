//! Room aggregate: participants, approval state, and owned polls.
//!
//! A [`RoomEntry`] is the unit of serialization in the engine. Everything a
//! room owns lives inside it, so holding the room's lock is enough to
//! mutate any of its participants or polls atomically.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::poll::{PollEntry, PollState, PollView};
use super::{ParticipantId, ParticipantToken, PollId, RoomId};
use crate::error::EngineError;

/// Maximum length of organizer and participant names, in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Organizer approval state of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for the organizer.
    Pending,
    /// Allowed to vote.
    Approved,
    /// Rejected by the organizer.
    Denied,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        })
    }
}

/// A named attendee of a room.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Participant identifier.
    pub participant_id: ParticipantId,
    /// Bearer credential used on vote calls.
    pub token: ParticipantToken,
    /// Name shown to the organizer.
    pub display_name: String,
    /// Current approval state.
    pub approval_status: ApprovalStatus,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Creates a pending participant with a fresh id and token.
    #[must_use]
    pub fn new(display_name: String) -> Self {
        Self {
            participant_id: ParticipantId::new(),
            token: ParticipantToken::generate(),
            display_name,
            approval_status: ApprovalStatus::Pending,
            joined_at: Utc::now(),
        }
    }

    /// Public view of the participant (no token).
    #[must_use]
    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            participant_id: self.participant_id,
            display_name: self.display_name.clone(),
            approval_status: self.approval_status,
            joined_at: self.joined_at,
        }
    }
}

/// Participant as shown in listings and reports.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    /// Participant identifier.
    pub participant_id: ParticipantId,
    /// Display name.
    pub display_name: String,
    /// Approval state.
    pub approval_status: ApprovalStatus,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

/// Outcome of an approve/deny decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The participant moved out of `pending`.
    Applied,
    /// The participant was already decided; nothing changed.
    Unchanged,
}

/// Consistent snapshot of a room's counters.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    /// Room identifier.
    pub room_id: RoomId,
    /// Organizer name.
    pub organizer_name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// All participants, in any state.
    pub participant_count: usize,
    /// Approved participants.
    pub approved_count: usize,
    /// Participants awaiting a decision.
    pub pending_count: usize,
    /// Denied participants.
    pub denied_count: usize,
    /// Total polls in the room.
    pub poll_count: usize,
    /// Polls currently accepting votes, in creation order.
    pub active_poll_ids: Vec<PollId>,
}

/// A room and everything it owns.
#[derive(Debug)]
pub struct RoomEntry {
    /// Room identifier (immutable).
    pub room_id: RoomId,
    /// Organizer display name.
    pub organizer_name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    participants: HashMap<ParticipantId, Participant>,
    join_order: Vec<ParticipantId>,
    tokens: HashMap<ParticipantToken, ParticipantId>,
    polls: HashMap<PollId, PollEntry>,
    poll_order: Vec<PollId>,
    purged: bool,
}

impl RoomEntry {
    /// Creates an empty room.
    #[must_use]
    pub fn new(room_id: RoomId, organizer_name: String) -> Self {
        Self {
            room_id,
            organizer_name,
            created_at: Utc::now(),
            participants: HashMap::new(),
            join_order: Vec::new(),
            tokens: HashMap::new(),
            polls: HashMap::new(),
            poll_order: Vec::new(),
            purged: false,
        }
    }

    /// Returns `true` once the room has been purged. A purged entry may
    /// still be reachable through a handle obtained before the purge.
    #[must_use]
    #[cfg(test)]
    pub const fn is_purged(&self) -> bool {
        self.purged
    }

    /// Fails with [`EngineError::RoomNotFound`] if the room was purged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RoomNotFound`] for a purged room.
    pub fn ensure_live(&self) -> Result<(), EngineError> {
        if self.purged {
            return Err(EngineError::RoomNotFound(self.room_id.to_string()));
        }
        Ok(())
    }

    /// Adds a participant and returns a reference to it.
    pub fn add_participant(&mut self, participant: Participant) -> &Participant {
        let id = participant.participant_id;
        self.tokens.insert(participant.token.clone(), id);
        self.join_order.push(id);
        self.participants.entry(id).or_insert(participant)
    }

    /// Looks up a participant by id.
    #[must_use]
    pub fn participant(&self, participant_id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&participant_id)
    }

    /// Resolves a token to its participant.
    #[must_use]
    pub fn participant_by_token(&self, token: &ParticipantToken) -> Option<&Participant> {
        self.tokens
            .get(token)
            .and_then(|id| self.participants.get(id))
    }

    /// Moves a pending participant to `approved` or `denied`.
    ///
    /// Deciding an already decided participant is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParticipantNotFound`] if the id is unknown, or
    /// [`EngineError::Internal`] if `to` is `pending`.
    pub fn decide(
        &mut self,
        participant_id: ParticipantId,
        to: ApprovalStatus,
    ) -> Result<(Decision, ParticipantView), EngineError> {
        if to == ApprovalStatus::Pending {
            return Err(EngineError::Internal("cannot move a participant back to pending".to_string()));
        }
        let participant = self
            .participants
            .get_mut(&participant_id)
            .ok_or(EngineError::ParticipantNotFound(participant_id))?;
        let decision = if participant.approval_status == ApprovalStatus::Pending {
            participant.approval_status = to;
            Decision::Applied
        } else {
            Decision::Unchanged
        };
        Ok((decision, participant.view()))
    }

    /// Participants in join order.
    #[must_use]
    pub fn participants(&self) -> Vec<ParticipantView> {
        self.join_order
            .iter()
            .filter_map(|id| self.participants.get(id))
            .map(Participant::view)
            .collect()
    }

    /// All participant ids (for index maintenance).
    pub fn participant_ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.join_order.iter().copied()
    }

    /// All participant tokens (for index maintenance).
    pub fn participant_tokens(&self) -> impl Iterator<Item = &ParticipantToken> + '_ {
        self.tokens.keys()
    }

    /// Adds a poll.
    pub fn add_poll(&mut self, poll: PollEntry) -> PollView {
        let view = poll.view();
        self.poll_order.push(poll.poll_id);
        self.polls.insert(poll.poll_id, poll);
        view
    }

    /// Looks up a poll.
    #[must_use]
    pub fn poll(&self, poll_id: PollId) -> Option<&PollEntry> {
        self.polls.get(&poll_id)
    }

    /// Looks up a poll mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PollNotFound`] if the poll is not in this room.
    pub fn poll_mut(&mut self, poll_id: PollId) -> Result<&mut PollEntry, EngineError> {
        self.polls
            .get_mut(&poll_id)
            .ok_or(EngineError::PollNotFound(poll_id))
    }

    /// Polls in creation order.
    #[must_use]
    pub fn polls(&self) -> Vec<PollView> {
        self.poll_order
            .iter()
            .filter_map(|id| self.polls.get(id))
            .map(PollEntry::view)
            .collect()
    }

    /// All poll ids in creation order.
    pub fn poll_ids(&self) -> impl Iterator<Item = PollId> + '_ {
        self.poll_order.iter().copied()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn status(&self) -> RoomStatus {
        let count = |status: ApprovalStatus| {
            self.participants
                .values()
                .filter(|p| p.approval_status == status)
                .count()
        };
        let active_poll_ids = self
            .poll_order
            .iter()
            .filter(|id| {
                self.polls
                    .get(*id)
                    .is_some_and(|p| p.state() == PollState::Active)
            })
            .copied()
            .collect();
        RoomStatus {
            room_id: self.room_id.clone(),
            organizer_name: self.organizer_name.clone(),
            created_at: self.created_at,
            participant_count: self.participants.len(),
            approved_count: count(ApprovalStatus::Approved),
            pending_count: count(ApprovalStatus::Pending),
            denied_count: count(ApprovalStatus::Denied),
            poll_count: self.polls.len(),
            active_poll_ids,
        }
    }

    /// Total votes recorded across all polls.
    #[must_use]
    pub fn vote_count(&self) -> usize {
        self.polls.values().map(PollEntry::voter_count).sum()
    }

    /// Drops all owned data and marks the room purged.
    pub fn clear(&mut self) {
        self.participants.clear();
        self.join_order.clear();
        self.tokens.clear();
        self.polls.clear();
        self.poll_order.clear();
        self.purged = true;
    }
}

/// Validates and trims a display name.
///
/// # Errors
///
/// Returns the error built by `on_invalid` if the trimmed name is empty or
/// longer than [`MAX_NAME_LEN`] characters.
pub fn validate_name(
    raw: &str,
    on_invalid: fn(String) -> EngineError,
) -> Result<String, EngineError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(on_invalid("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(on_invalid(format!("name exceeds {MAX_NAME_LEN} characters")));
    }
    Ok(name.to_string())
}
