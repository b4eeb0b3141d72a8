//! Domain layer: identifiers, room and poll aggregates, vote ledger, and
//! the event system.
//!
//! This module contains the engine's state model: the room id policy,
//! rooms with their participants and polls, the per-poll vote ledger, the
//! broadcast hub for room events, and the registry that stores rooms for
//! concurrent access.

pub mod broadcast_hub;
pub mod ids;
pub mod poll;
pub mod room;
pub mod room_event;
pub mod room_id;
pub mod room_registry;
pub mod vote_ledger;

pub use broadcast_hub::BroadcastHub;
pub use ids::{ParticipantId, ParticipantToken, PollId};
pub use poll::{PollDraft, PollEntry, PollState, PollView, StopCause, StopOutcome};
pub use room::{ApprovalStatus, Participant, ParticipantView, RoomEntry, RoomStatus};
pub use room_event::RoomEvent;
pub use room_id::RoomId;
pub use room_registry::{RoomHandle, RoomRegistry};
pub use vote_ledger::{Tally, VoteLedger};
