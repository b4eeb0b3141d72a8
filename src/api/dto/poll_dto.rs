//! Poll and vote DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PollId, PollView, RoomId, Tally};
use crate::service::VoteReceipt;

/// Request body for `POST /api/rooms/{room_id}/polls`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePollRequest {
    /// Question text (1-500 characters).
    pub question: String,
    /// 2-20 distinct options.
    pub options: Vec<String>,
    /// Optional auto-stop timer in minutes; fractions allowed.
    #[serde(default)]
    pub timer_minutes: Option<f64>,
}

/// A poll with its live or frozen tally.
#[derive(Debug, Serialize, ToSchema)]
pub struct PollDto {
    /// Poll identifier.
    #[schema(value_type = uuid::Uuid)]
    pub poll_id: PollId,
    /// Owning room.
    #[schema(value_type = String)]
    pub room_id: RoomId,
    /// Question text.
    pub question: String,
    /// Options in display order.
    pub options: Vec<String>,
    /// Auto-stop timer in minutes.
    pub timer_minutes: Option<f64>,
    /// `created`, `active` or `closed`.
    #[schema(example = "active")]
    pub state: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Auto-stop deadline while active.
    pub closes_at: Option<DateTime<Utc>>,
    /// `manual` or `timer` once closed.
    pub closed_by: Option<String>,
    /// Option to count, in option order.
    #[schema(value_type = Object, example = json!({"Red": 2, "Blue": 1}))]
    pub vote_counts: Tally,
    /// Sum of all counts.
    pub total_votes: u64,
}

impl From<PollView> for PollDto {
    fn from(p: PollView) -> Self {
        Self {
            poll_id: p.poll_id,
            room_id: p.room_id,
            question: p.question,
            options: p.options,
            timer_minutes: p.timer_minutes,
            state: p.state.to_string(),
            created_at: p.created_at,
            started_at: p.started_at,
            closed_at: p.closed_at,
            closes_at: p.closes_at,
            closed_by: p.closed_by.map(|c| c.to_string()),
            vote_counts: p.vote_counts,
            total_votes: p.total_votes,
        }
    }
}

/// Response body for `GET /api/rooms/{room_id}/polls`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PollListResponse {
    /// Room listed.
    #[schema(value_type = String)]
    pub room_id: RoomId,
    /// Polls in creation order.
    pub polls: Vec<PollDto>,
}

/// Request body for `POST /api/polls/{poll_id}/vote`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteRequest {
    /// Token returned on join.
    pub participant_token: String,
    /// Chosen option, matched exactly.
    pub option: String,
}

/// Response body for an accepted vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    /// Poll voted on.
    #[schema(value_type = uuid::Uuid)]
    pub poll_id: PollId,
    /// Always `"recorded"`.
    pub status: String,
    /// Acceptance time.
    pub recorded_at: DateTime<Utc>,
}

impl From<VoteReceipt> for VoteResponse {
    fn from(r: VoteReceipt) -> Self {
        Self {
            poll_id: r.poll_id,
            status: "recorded".to_string(),
            recorded_at: r.recorded_at,
        }
    }
}
