//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    CreatePollRequest, CreateRoomRequest, JoinRoomRequest, JoinRoomResponse, ParticipantDto,
    ParticipantListResponse, PollDto, PollListResponse, PurgeResponse, RoomReportResponse,
    RoomStatusResponse, VoteRequest, VoteResponse,
};
use super::handlers::{poll, room, system};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "secret-poll",
        description = "Anonymous real-time polling rooms: organizer-approved participants, one secret vote per poll, live tallies over WebSocket."
    ),
    paths(
        system::health_handler,
        room::create_room,
        room::room_status,
        room::join_room,
        room::list_participants,
        room::approve_participant,
        room::deny_participant,
        room::room_report,
        room::purge_room,
        poll::create_poll,
        poll::list_polls,
        poll::start_poll,
        poll::stop_poll,
        poll::cast_vote,
    ),
    components(schemas(
        system::HealthResponse,
        CreateRoomRequest,
        RoomStatusResponse,
        JoinRoomRequest,
        JoinRoomResponse,
        ParticipantDto,
        ParticipantListResponse,
        RoomReportResponse,
        PurgeResponse,
        CreatePollRequest,
        PollDto,
        PollListResponse,
        VoteRequest,
        VoteResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Health and service info"),
        (name = "Rooms", description = "Room lifecycle and snapshots"),
        (name = "Participants", description = "Organizer approval decisions"),
        (name = "Polls", description = "Poll lifecycle and voting"),
    )
)]
pub struct ApiDoc;
