//! Room service: room creation, joining, approval, and snapshot queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::room::{Decision, validate_name};
use crate::domain::{
    ApprovalStatus, BroadcastHub, Participant, ParticipantId, ParticipantToken, ParticipantView,
    PollView, RoomEvent, RoomHandle, RoomId, RoomRegistry, RoomStatus,
};
use crate::error::EngineError;

/// A participant that just joined, with the token handed to its client.
#[derive(Debug, Clone)]
pub struct JoinedParticipant {
    /// Room joined.
    pub room_id: RoomId,
    /// Public view of the new participant.
    pub participant: ParticipantView,
    /// Credential for later vote calls. Shown only once.
    pub token: ParticipantToken,
}

/// Read-only snapshot of a whole room for export.
///
/// Taken under a single room lock, so status, polls and participants are
/// mutually consistent.
#[derive(Debug, Clone, Serialize)]
pub struct RoomReport {
    /// Room counters.
    pub status: RoomStatus,
    /// Polls in creation order with their tallies.
    pub polls: Vec<PollView>,
    /// Participants in join order.
    pub participants: Vec<ParticipantView>,
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
}

/// Orchestrates room and participant lifecycle.
///
/// Every mutation locks the room, applies the change, and publishes its
/// events before releasing the lock, so subscribers observe events in the
/// order mutations were accepted.
#[derive(Debug, Clone)]
pub struct RoomService {
    registry: Arc<RoomRegistry>,
    hub: BroadcastHub,
}

impl RoomService {
    /// Creates a new `RoomService`.
    #[must_use]
    pub fn new(registry: Arc<RoomRegistry>, hub: BroadcastHub) -> Self {
        Self { registry, hub }
    }

    /// Creates a room, claiming `custom_id` or generating a random id.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidOrganizerName`] for a blank or overlong name.
    /// - [`EngineError::InvalidRoomId`] if `custom_id` is malformed.
    /// - [`EngineError::DuplicateRoomId`] if `custom_id` is taken.
    pub async fn create_room(
        &self,
        organizer_name: &str,
        custom_id: Option<&str>,
    ) -> Result<RoomStatus, EngineError> {
        let organizer_name = validate_name(organizer_name, EngineError::InvalidOrganizerName)?;
        let custom_id = custom_id.map(RoomId::parse).transpose()?;

        let (room_id, handle) = self.registry.create(custom_id, &organizer_name)?;
        let status = self.open_channel(&handle).await?;

        tracing::info!(%room_id, "room created");
        Ok(status)
    }

    /// Opens the broadcast channel of a freshly registered room.
    ///
    /// Fails with [`EngineError::RoomNotFound`] if a purge locked the room
    /// first, so no channel outlives its room.
    async fn open_channel(&self, handle: &RoomHandle) -> Result<RoomStatus, EngineError> {
        let entry = handle.lock().await;
        entry.ensure_live()?;
        self.hub.open(&entry.room_id);
        Ok(entry.status())
    }

    /// Adds a pending participant to a room.
    ///
    /// Joining is allowed at any time, including while polls are active.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidParticipantName`] for a blank or overlong name.
    /// - [`EngineError::RoomNotFound`] if the room does not exist.
    pub async fn join(
        &self,
        room_id: &str,
        participant_name: &str,
    ) -> Result<JoinedParticipant, EngineError> {
        let room_id = lookup_id(room_id)?;
        let display_name = validate_name(participant_name, EngineError::InvalidParticipantName)?;

        let handle = self.registry.room(&room_id)?;
        let mut entry = handle.lock().await;
        entry.ensure_live()?;

        let participant = entry.add_participant(Participant::new(display_name));
        let joined = JoinedParticipant {
            room_id: room_id.clone(),
            participant: participant.view(),
            token: participant.token.clone(),
        };
        self.registry
            .index_participant(&room_id, joined.participant.participant_id, joined.token.clone());

        self.hub.publish(RoomEvent::participant_update(&entry.status()));
        tracing::info!(
            %room_id,
            participant_id = %joined.participant.participant_id,
            "participant joined"
        );
        Ok(joined)
    }

    /// Approves a pending participant. No-op if already decided.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParticipantNotFound`] if the participant is unknown.
    pub async fn approve(&self, participant_id: ParticipantId) -> Result<ParticipantView, EngineError> {
        self.decide(participant_id, ApprovalStatus::Approved).await
    }

    /// Denies a pending participant. No-op if already decided.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParticipantNotFound`] if the participant is unknown.
    pub async fn deny(&self, participant_id: ParticipantId) -> Result<ParticipantView, EngineError> {
        self.decide(participant_id, ApprovalStatus::Denied).await
    }

    async fn decide(
        &self,
        participant_id: ParticipantId,
        to: ApprovalStatus,
    ) -> Result<ParticipantView, EngineError> {
        let handle = self.registry.room_of_participant(participant_id)?;
        let mut entry = handle.lock().await;
        let (decision, view) = entry.decide(participant_id, to)?;
        if decision == Decision::Unchanged {
            tracing::debug!(%participant_id, status = %view.approval_status, "participant already decided");
            return Ok(view);
        }

        let room_id = entry.room_id.clone();
        let timestamp = Utc::now();
        let specific = match to {
            ApprovalStatus::Denied => RoomEvent::ParticipantDenied {
                room_id: room_id.clone(),
                participant_id,
                display_name: view.display_name.clone(),
                timestamp,
            },
            _ => RoomEvent::ParticipantApproved {
                room_id: room_id.clone(),
                participant_id,
                display_name: view.display_name.clone(),
                timestamp,
            },
        };
        self.hub.publish(specific);
        self.hub.publish(RoomEvent::participant_update(&entry.status()));

        tracing::info!(%room_id, %participant_id, status = %to, "participant decided");
        Ok(view)
    }

    /// Consistent counter snapshot of a room.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RoomNotFound`] if the room does not exist.
    pub async fn status(&self, room_id: &str) -> Result<RoomStatus, EngineError> {
        let room_id = lookup_id(room_id)?;
        let handle = self.registry.room(&room_id)?;
        let entry = handle.lock().await;
        entry.ensure_live()?;
        Ok(entry.status())
    }

    /// Participants of a room in join order. Carries no vote data.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RoomNotFound`] if the room does not exist.
    pub async fn participants(&self, room_id: &str) -> Result<Vec<ParticipantView>, EngineError> {
        let room_id = lookup_id(room_id)?;
        let handle = self.registry.room(&room_id)?;
        let entry = handle.lock().await;
        entry.ensure_live()?;
        Ok(entry.participants())
    }

    /// Export snapshot of a room: status, polls and participants.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RoomNotFound`] if the room does not exist.
    pub async fn report(&self, room_id: &str) -> Result<RoomReport, EngineError> {
        let room_id = lookup_id(room_id)?;
        let handle = self.registry.room(&room_id)?;
        let entry = handle.lock().await;
        entry.ensure_live()?;
        Ok(RoomReport {
            status: entry.status(),
            polls: entry.polls(),
            participants: entry.participants(),
            generated_at: Utc::now(),
        })
    }
}

/// Parses a room id used to look up an existing room. A malformed id
/// cannot name a room, so it reports [`EngineError::RoomNotFound`].
pub(crate) fn lookup_id(raw: &str) -> Result<RoomId, EngineError> {
    RoomId::parse(raw).map_err(|_| EngineError::RoomNotFound(raw.trim().to_string()))
}
