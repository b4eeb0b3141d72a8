//! Room handlers: create, status, join, approval, participants, report, purge.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use super::{json_body, path_param};
use crate::api::dto::{
    CreateRoomRequest, JoinRoomRequest, JoinRoomResponse, ParticipantDto,
    ParticipantListResponse, PurgeResponse, RoomReportResponse, RoomStatusResponse,
};
use crate::app_state::AppState;
use crate::domain::ParticipantId;
use crate::error::{EngineError, ErrorResponse};
use crate::service::room_service::lookup_id;

/// `POST /api/rooms` — Create a room.
///
/// # Errors
///
/// Returns [`EngineError`] on an invalid name or room id, or a taken id.
#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "Rooms",
    summary = "Create a room",
    description = "Creates a room with a custom id (3-10 alphanumeric, case-insensitive) or a random six-character id.",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomStatusResponse),
        (status = 400, description = "Invalid organizer name or room id", body = ErrorResponse),
        (status = 409, description = "Room id already in use", body = ErrorResponse),
    )
)]
pub async fn create_room(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let req = json_body(payload)?;
    let status = state
        .room_service
        .create_room(&req.organizer_name, req.custom_room_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(RoomStatusResponse::from(status))))
}

/// `GET /api/rooms/{room_id}/status` — Room counters.
///
/// # Errors
///
/// Returns [`EngineError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/status",
    tag = "Rooms",
    summary = "Room status",
    description = "Consistent snapshot of participant counters and active polls.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    responses(
        (status = 200, description = "Room status", body = RoomStatusResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_status(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let status = state.room_service.status(&room_id).await?;
    Ok(Json(RoomStatusResponse::from(status)))
}

/// `POST /api/rooms/{room_id}/join` — Join a room.
///
/// # Errors
///
/// Returns [`EngineError`] on an invalid name or unknown room.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/join",
    tag = "Rooms",
    summary = "Join a room",
    description = "Adds a pending participant and returns its voting token. Joining is allowed while polls are running.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    request_body = JoinRoomRequest,
    responses(
        (status = 201, description = "Joined; awaiting approval", body = JoinRoomResponse),
        (status = 400, description = "Invalid participant name", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    payload: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let req = json_body(payload)?;
    let joined = state
        .room_service
        .join(&room_id, &req.participant_name)
        .await?;
    Ok((StatusCode::CREATED, Json(JoinRoomResponse::from(joined))))
}

/// `GET /api/rooms/{room_id}/participants` — Participant listing.
///
/// # Errors
///
/// Returns [`EngineError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/participants",
    tag = "Rooms",
    summary = "List participants",
    description = "Participants in join order with approval state. Contains no vote data.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    responses(
        (status = 200, description = "Participants", body = ParticipantListResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let participants = state.room_service.participants(&room_id).await?;
    Ok(Json(ParticipantListResponse {
        room_id: lookup_id(&room_id)?,
        participants: participants.into_iter().map(ParticipantDto::from).collect(),
    }))
}

/// `POST /api/participants/{participant_id}/approve` — Approve a participant.
///
/// # Errors
///
/// Returns [`EngineError::ParticipantNotFound`] if the participant is unknown.
#[utoipa::path(
    post,
    path = "/api/participants/{participant_id}/approve",
    tag = "Participants",
    summary = "Approve a participant",
    description = "Moves a pending participant to approved. Repeating on a decided participant is a no-op.",
    params(("participant_id" = uuid::Uuid, Path, description = "Participant UUID")),
    responses(
        (status = 200, description = "Participant after the decision", body = ParticipantDto),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn approve_participant(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let participant_id = ParticipantId::from_uuid(path_param(id)?);
    let view = state.room_service.approve(participant_id).await?;
    Ok(Json(ParticipantDto::from(view)))
}

/// `POST /api/participants/{participant_id}/deny` — Deny a participant.
///
/// # Errors
///
/// Returns [`EngineError::ParticipantNotFound`] if the participant is unknown.
#[utoipa::path(
    post,
    path = "/api/participants/{participant_id}/deny",
    tag = "Participants",
    summary = "Deny a participant",
    description = "Moves a pending participant to denied. Repeating on a decided participant is a no-op.",
    params(("participant_id" = uuid::Uuid, Path, description = "Participant UUID")),
    responses(
        (status = 200, description = "Participant after the decision", body = ParticipantDto),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn deny_participant(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
) -> Result<impl IntoResponse, EngineError> {
    let participant_id = ParticipantId::from_uuid(path_param(id)?);
    let view = state.room_service.deny(participant_id).await?;
    Ok(Json(ParticipantDto::from(view)))
}

/// `GET /api/rooms/{room_id}/report` — Export snapshot.
///
/// # Errors
///
/// Returns [`EngineError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/report",
    tag = "Rooms",
    summary = "Room report",
    description = "Read-only snapshot of status, polls with tallies, and participants, taken atomically. Intended for document renderers.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    responses(
        (status = 200, description = "Room report", body = RoomReportResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_report(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let report = state.room_service.report(&room_id).await?;
    Ok(Json(RoomReportResponse::from(report)))
}

/// `DELETE /api/rooms/{room_id}` — Purge a room.
///
/// # Errors
///
/// Returns [`EngineError::RoomNotFound`] for an unknown room, or
/// [`EngineError::PurgeFailed`] (retryable) if storage could not be erased.
#[utoipa::path(
    delete,
    path = "/api/rooms/{room_id}",
    tag = "Rooms",
    summary = "Purge a room",
    description = "Irreversibly deletes the room, its participants, polls, votes, pending timers and journal. All or nothing.",
    params(("room_id" = String, Path, description = "Room id (case-insensitive)")),
    responses(
        (status = 200, description = "Room purged", body = PurgeResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
        (status = 503, description = "Purge failed; room intact, retry", body = ErrorResponse),
    )
)]
pub async fn purge_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let report = state.purge.purge(&room_id).await?;
    Ok(Json(PurgeResponse::from(report)))
}

/// Room and participant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", delete(purge_room))
        .route("/rooms/{room_id}/status", get(room_status))
        .route("/rooms/{room_id}/join", post(join_room))
        .route("/rooms/{room_id}/participants", get(list_participants))
        .route("/rooms/{room_id}/report", get(room_report))
        .route("/participants/{participant_id}/approve", post(approve_participant))
        .route("/participants/{participant_id}/deny", post(deny_participant))
}
