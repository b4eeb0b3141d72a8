//! Room and participant DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::poll_dto::PollDto;
use crate::domain::{ParticipantId, ParticipantView, PollId, RoomId, RoomStatus};
use crate::service::{JoinedParticipant, PurgeReport, RoomReport};

/// Request body for `POST /api/rooms`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Organizer display name (1-50 characters).
    pub organizer_name: String,
    /// Optional custom room id (3-10 alphanumeric, case-insensitive).
    #[serde(default)]
    pub custom_room_id: Option<String>,
}

/// Room counters. Returned by create and status.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomStatusResponse {
    /// Uppercase room id.
    #[schema(value_type = String, example = "TEAM01")]
    pub room_id: RoomId,
    /// Organizer display name.
    pub organizer_name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// All participants.
    pub participant_count: usize,
    /// Approved participants.
    pub approved_count: usize,
    /// Participants awaiting approval.
    pub pending_count: usize,
    /// Denied participants.
    pub denied_count: usize,
    /// Polls in the room.
    pub poll_count: usize,
    /// Polls accepting votes, in creation order.
    #[schema(value_type = Vec<uuid::Uuid>)]
    pub active_poll_ids: Vec<PollId>,
}

impl From<RoomStatus> for RoomStatusResponse {
    fn from(s: RoomStatus) -> Self {
        Self {
            room_id: s.room_id,
            organizer_name: s.organizer_name,
            created_at: s.created_at,
            participant_count: s.participant_count,
            approved_count: s.approved_count,
            pending_count: s.pending_count,
            denied_count: s.denied_count,
            poll_count: s.poll_count,
            active_poll_ids: s.active_poll_ids,
        }
    }
}

/// Request body for `POST /api/rooms/{room_id}/join`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Participant display name (1-50 characters).
    pub participant_name: String,
}

/// Response body for a join (201 Created).
///
/// The token is returned only here; clients present it on vote calls.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinRoomResponse {
    /// Room joined.
    #[schema(value_type = String)]
    pub room_id: RoomId,
    /// New participant.
    pub participant: ParticipantDto,
    /// Bearer credential for voting.
    pub participant_token: String,
}

impl From<JoinedParticipant> for JoinRoomResponse {
    fn from(joined: JoinedParticipant) -> Self {
        Self {
            room_id: joined.room_id,
            participant_token: joined.token.as_str().to_string(),
            participant: joined.participant.into(),
        }
    }
}

/// Participant as listed to the organizer. Carries no vote data.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantDto {
    /// Participant identifier.
    #[schema(value_type = uuid::Uuid)]
    pub participant_id: ParticipantId,
    /// Display name.
    pub display_name: String,
    /// `pending`, `approved` or `denied`.
    #[schema(example = "pending")]
    pub approval_status: String,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<ParticipantView> for ParticipantDto {
    fn from(p: ParticipantView) -> Self {
        Self {
            participant_id: p.participant_id,
            display_name: p.display_name,
            approval_status: p.approval_status.to_string(),
            joined_at: p.joined_at,
        }
    }
}

/// Response body for `GET /api/rooms/{room_id}/participants`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantListResponse {
    /// Room listed.
    #[schema(value_type = String)]
    pub room_id: RoomId,
    /// Participants in join order.
    pub participants: Vec<ParticipantDto>,
}

/// Response body for `GET /api/rooms/{room_id}/report`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomReportResponse {
    /// Room counters.
    pub status: RoomStatusResponse,
    /// Polls in creation order with tallies.
    pub polls: Vec<PollDto>,
    /// Participants in join order.
    pub participants: Vec<ParticipantDto>,
    /// Snapshot time.
    pub generated_at: DateTime<Utc>,
}

impl From<RoomReport> for RoomReportResponse {
    fn from(r: RoomReport) -> Self {
        Self {
            status: r.status.into(),
            polls: r.polls.into_iter().map(PollDto::from).collect(),
            participants: r.participants.into_iter().map(ParticipantDto::from).collect(),
            generated_at: r.generated_at,
        }
    }
}

/// Response body for `DELETE /api/rooms/{room_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurgeResponse {
    /// Purged room.
    #[schema(value_type = String)]
    pub room_id: RoomId,
    /// Always `"purged"`.
    pub status: String,
    /// Participants removed.
    pub participants_removed: usize,
    /// Polls removed.
    pub polls_removed: usize,
    /// Votes removed.
    pub votes_removed: usize,
    /// Pending timers cancelled.
    pub timers_cancelled: usize,
    /// Journal entries erased.
    pub journal_entries_erased: u64,
    /// Completion time.
    pub purged_at: DateTime<Utc>,
}

impl From<PurgeReport> for PurgeResponse {
    fn from(r: PurgeReport) -> Self {
        Self {
            room_id: r.room_id,
            status: "purged".to_string(),
            participants_removed: r.participants_removed,
            polls_removed: r.polls_removed,
            votes_removed: r.votes_removed,
            timers_cancelled: r.timers_cancelled,
            journal_entries_erased: r.journal_entries_erased,
            purged_at: r.purged_at,
        }
    }
}
