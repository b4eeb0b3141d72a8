//! Poll handlers: create, list, start, stop, vote.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use super::{json_body, path_param};
use crate::api::dto::{CreatePollRequest, PollDto, PollListResponse, VoteRequest, VoteResponse};
use crate::app_state::AppState;
use crate::domain::{ParticipantToken, PollId, StopCause};
use crate::error::{EngineError, ErrorResponse};
use crate::service::room_service::lookup_id;

/// `POST /api/rooms/{room_id}/polls` — Create a poll.
///
/// # Errors
///
/// Returns [`EngineError::InvalidPoll`] on bad input or
/// [`EngineError::RoomNotFound`] for an unknown room.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/polls",
    tag = "Polls",
    summary = "Create a poll",
    description = "Creates a poll in the `created` state. Options are trimmed and must be distinct; the optional timer is in minutes.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Poll created", body = PollDto),
        (status = 400, description = "Invalid poll", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn create_poll(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let req = json_body(payload)?;
    let view = state
        .poll_service
        .create(&room_id, &req.question, &req.options, req.timer_minutes)
        .await?;
    Ok((StatusCode::CREATED, Json(PollDto::from(view))))
}

/// `GET /api/rooms/{room_id}/polls` — Poll listing.
///
/// # Errors
///
/// Returns [`EngineError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/polls",
    tag = "Polls",
    summary = "List polls",
    description = "Polls in creation order with state, options, and live or frozen tallies.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    responses(
        (status = 200, description = "Polls", body = PollListResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn list_polls(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let polls = state.poll_service.list_polls(&room_id).await?;
    Ok(Json(PollListResponse {
        room_id: lookup_id(&room_id)?,
        polls: polls.into_iter().map(PollDto::from).collect(),
    }))
}

/// `POST /api/polls/{poll_id}/start` — Start a poll.
///
/// # Errors
///
/// Returns [`EngineError::PollNotFound`] or [`EngineError::InvalidTransition`].
#[utoipa::path(
    post,
    path = "/api/polls/{poll_id}/start",
    tag = "Polls",
    summary = "Start a poll",
    description = "Opens a created poll for voting and arms its auto-stop timer.",
    params(("poll_id" = uuid::Uuid, Path, description = "Poll UUID")),
    responses(
        (status = 200, description = "Poll started", body = PollDto),
        (status = 404, description = "Poll not found", body = ErrorResponse),
        (status = 409, description = "Poll is not in the created state", body = ErrorResponse),
    )
)]
pub async fn start_poll(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let poll_id = PollId::from_uuid(path_param(id)?);
    let view = state.poll_service.start(poll_id).await?;
    Ok(Json(PollDto::from(view)))
}

/// `POST /api/polls/{poll_id}/stop` — Stop a poll.
///
/// # Errors
///
/// Returns [`EngineError::PollNotFound`] or [`EngineError::InvalidTransition`].
#[utoipa::path(
    post,
    path = "/api/polls/{poll_id}/stop",
    tag = "Polls",
    summary = "Stop a poll",
    description = "Closes an active poll and freezes its tally. Cancels a pending timer.",
    params(("poll_id" = uuid::Uuid, Path, description = "Poll UUID")),
    responses(
        (status = 200, description = "Poll closed", body = PollDto),
        (status = 404, description = "Poll not found", body = ErrorResponse),
        (status = 409, description = "Poll is not active", body = ErrorResponse),
    )
)]
pub async fn stop_poll(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let poll_id = PollId::from_uuid(path_param(id)?);
    let (_, view) = state.poll_service.stop(poll_id, StopCause::Manual).await?;
    Ok(Json(PollDto::from(view)))
}

/// `POST /api/polls/{poll_id}/vote` — Cast a vote.
///
/// # Errors
///
/// Returns [`EngineError`] when the token, poll state, approval, option or
/// duplicate check fails.
#[utoipa::path(
    post,
    path = "/api/polls/{poll_id}/vote",
    tag = "Polls",
    summary = "Cast a vote",
    description = "Records one anonymous vote for an approved participant. Only the tally is ever exposed.",
    params(("poll_id" = uuid::Uuid, Path, description = "Poll UUID")),
    request_body = VoteRequest,
    responses(
        (status = 201, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Option not in poll", body = ErrorResponse),
        (status = 401, description = "Unknown participant token", body = ErrorResponse),
        (status = 403, description = "Participant not approved", body = ErrorResponse),
        (status = 404, description = "Poll not found", body = ErrorResponse),
        (status = 409, description = "Poll not active or already voted", body = ErrorResponse),
    )
)]
pub async fn cast_vote(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let poll_id = PollId::from_uuid(path_param(id)?);
    let req = json_body(payload)?;
    let token = ParticipantToken::from_presented(&req.participant_token);
    let receipt = state.poll_service.vote(poll_id, &token, &req.option).await?;
    Ok((StatusCode::CREATED, Json(VoteResponse::from(receipt))))
}

/// Poll routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms/{room_id}/polls", post(create_poll).get(list_polls))
        .route("/polls/{poll_id}/start", post(start_poll))
        .route("/polls/{poll_id}/stop", post(stop_poll))
        .route("/polls/{poll_id}/vote", post(cast_vote))
}
