//! Engine error kinds with HTTP status code mapping.
//!
//! [`EngineError`] is the single error type surfaced by every engine
//! operation. Each variant maps to a stable numeric code and an HTTP status
//! so the transport layer can render it without inspecting the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ParticipantId, PollId, PollState};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2004,
///     "message": "participant has already voted on this poll",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error kinds produced by the room/poll engine.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                         |
/// |-----------|-----------------------|-------------------------------------|
/// | 1000–1999 | Validation            | 400 Bad Request                     |
/// | 2000–2999 | Not Found / State     | 404 Not Found / 409 Conflict / 403  |
/// | 3000–3999 | Server                | 500 Internal / 503 Unavailable      |
///
/// Validation errors are never retryable without correcting the input.
/// [`EngineError::Unavailable`] and [`EngineError::PurgeFailed`] are
/// transient and may be retried by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Custom room id is not 3–10 alphanumeric characters.
    #[error("invalid room id: {0}")]
    InvalidRoomId(String),

    /// Room id is already taken (comparison is case-insensitive).
    #[error("room id already in use: {0}")]
    DuplicateRoomId(String),

    /// Organizer name is empty or too long.
    #[error("invalid organizer name: {0}")]
    InvalidOrganizerName(String),

    /// Participant display name is empty or too long.
    #[error("invalid participant name: {0}")]
    InvalidParticipantName(String),

    /// Poll question or options failed validation.
    #[error("invalid poll: {0}")]
    InvalidPoll(String),

    /// Selected option is not one of the poll's options.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Transport-level request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No room with the given id exists.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// No participant with the given id exists.
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Participant token does not resolve to any participant.
    #[error("unknown participant token")]
    InvalidToken,

    /// No poll with the given id exists.
    #[error("poll not found: {0}")]
    PollNotFound(PollId),

    /// Requested poll transition is not allowed from the current state.
    #[error("poll {poll_id} cannot transition from {from}")]
    InvalidTransition {
        /// Poll that rejected the transition.
        poll_id: PollId,
        /// State the poll was in.
        from: PollState,
    },

    /// Poll is not accepting votes.
    #[error("poll {0} is not active")]
    PollNotActive(PollId),

    /// Participant has not been approved by the organizer.
    #[error("participant is not approved")]
    ParticipantNotApproved,

    /// Participant already has a vote recorded on this poll.
    #[error("participant has already voted on this poll")]
    AlreadyVoted,

    /// Purge could not complete; the room is left intact and may be purged again.
    #[error("purge failed, retry: {0}")]
    PurgeFailed(String),

    /// Backing infrastructure is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1000,
            Self::InvalidRoomId(_) => 1001,
            Self::InvalidOrganizerName(_) => 1002,
            Self::InvalidParticipantName(_) => 1003,
            Self::InvalidPoll(_) => 1004,
            Self::InvalidOption(_) => 1005,
            Self::RoomNotFound(_) => 2001,
            Self::ParticipantNotFound(_) => 2002,
            Self::PollNotFound(_) => 2003,
            Self::AlreadyVoted => 2004,
            Self::DuplicateRoomId(_) => 2005,
            Self::InvalidTransition { .. } => 2006,
            Self::PollNotActive(_) => 2007,
            Self::ParticipantNotApproved => 2008,
            Self::InvalidToken => 2009,
            Self::Internal(_) => 3000,
            Self::PurgeFailed(_) => 3001,
            Self::Unavailable(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidRoomId(_)
            | Self::InvalidOrganizerName(_)
            | Self::InvalidParticipantName(_)
            | Self::InvalidPoll(_)
            | Self::InvalidOption(_) => StatusCode::BAD_REQUEST,
            Self::RoomNotFound(_) | Self::ParticipantNotFound(_) | Self::PollNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::DuplicateRoomId(_)
            | Self::AlreadyVoted
            | Self::InvalidTransition { .. }
            | Self::PollNotActive(_) => StatusCode::CONFLICT,
            Self::ParticipantNotApproved => StatusCode::FORBIDDEN,
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PurgeFailed(_) | Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns `true` if the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PurgeFailed(_) | Self::Unavailable(_))
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.error_code(), error = %self, "request failed");
        }
        let details = self.is_retryable().then(|| "retry with backoff".to_string());
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
