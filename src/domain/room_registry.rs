//! Concurrent room storage with per-room locking.
//!
//! [`RoomRegistry`] maps room ids to individually locked [`RoomEntry`]s and
//! keeps secondary indexes from poll ids, participant ids and participant
//! tokens back to their room. Every mutation of a room happens under that
//! room's [`tokio::sync::Mutex`]; different rooms proceed in parallel.
//!
//! # Locking
//!
//! The indexes are sharded maps. Their shard locks are synchronous, held
//! only for a single insert, remove or lookup, and never across an
//! `.await`, so they never nest with a room lock. Lookups clone the room
//! handle before locking the room, so a caller must re-check the entry
//! after locking it: a purge may have emptied it in between.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use super::room::RoomEntry;
use super::{ParticipantId, ParticipantToken, PollId, RoomId};
use crate::error::EngineError;

/// Shared, lockable handle to one room.
pub type RoomHandle = Arc<Mutex<RoomEntry>>;

/// Attempts at drawing an unused random room id before giving up.
const MAX_GENERATE_ATTEMPTS: usize = 64;

/// Central store for all live rooms.
///
/// # Concurrency
///
/// - Room id uniqueness is claimed atomically on the id's shard.
/// - Mutations of one room are serialized by its mutex.
/// - Secondary index keys are written and removed under the owning room's
///   mutex, so they always describe a live room or one being purged.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomHandle>,
    participants: DashMap<ParticipantId, RoomId>,
    tokens: DashMap<ParticipantToken, RoomId>,
    polls: DashMap<PollId, RoomId>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a room.
    ///
    /// With `custom_id` the id is claimed as given; otherwise a random
    /// unused id is generated.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DuplicateRoomId`] if `custom_id` is taken.
    /// - [`EngineError::Internal`] if no free random id could be found.
    pub fn create(
        &self,
        custom_id: Option<RoomId>,
        organizer_name: &str,
    ) -> Result<(RoomId, RoomHandle), EngineError> {
        match custom_id {
            Some(id) => {
                let taken = id.to_string();
                self.claim(id, organizer_name)
                    .ok_or(EngineError::DuplicateRoomId(taken))
            }
            None => {
                let mut rng = rand::thread_rng();
                (0..MAX_GENERATE_ATTEMPTS)
                    .find_map(|_| self.claim(RoomId::generate(&mut rng), organizer_name))
                    .ok_or_else(|| {
                        EngineError::Internal("could not allocate a free room id".to_string())
                    })
            }
        }
    }

    fn claim(&self, room_id: RoomId, organizer_name: &str) -> Option<(RoomId, RoomHandle)> {
        match self.rooms.entry(room_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let room_id = slot.key().clone();
                let handle = Arc::new(Mutex::new(RoomEntry::new(
                    room_id.clone(),
                    organizer_name.to_string(),
                )));
                slot.insert(Arc::clone(&handle));
                Some((room_id, handle))
            }
        }
    }

    /// Returns the handle of a room.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RoomNotFound`] if no such room exists.
    pub fn room(&self, room_id: &RoomId) -> Result<RoomHandle, EngineError> {
        self.rooms
            .get(room_id)
            .map(|handle| Arc::clone(handle.value()))
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))
    }

    /// Returns the handle of the room owning a poll.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PollNotFound`] if the poll is unknown.
    pub fn room_of_poll(&self, poll_id: PollId) -> Result<RoomHandle, EngineError> {
        self.resolve(&self.polls, &poll_id)
            .ok_or(EngineError::PollNotFound(poll_id))
    }

    /// Returns the handle of the room a participant belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParticipantNotFound`] if the participant is unknown.
    pub fn room_of_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<RoomHandle, EngineError> {
        self.resolve(&self.participants, &participant_id)
            .ok_or(EngineError::ParticipantNotFound(participant_id))
    }

    /// Returns the handle of the room a participant token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidToken`] if the token is unknown.
    pub fn room_of_token(&self, token: &ParticipantToken) -> Result<RoomHandle, EngineError> {
        self.resolve(&self.tokens, token)
            .ok_or(EngineError::InvalidToken)
    }

    fn resolve<K: Eq + Hash>(&self, index: &DashMap<K, RoomId>, key: &K) -> Option<RoomHandle> {
        // Copy the id out so the two shard locks are never held together.
        let room_id = index.get(key).map(|r| r.value().clone())?;
        self.room(&room_id).ok()
    }

    /// Indexes a participant that was just added to `room_id`.
    ///
    /// The caller must hold the room's lock.
    pub fn index_participant(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        token: ParticipantToken,
    ) {
        self.participants.insert(participant_id, room_id.clone());
        self.tokens.insert(token, room_id.clone());
    }

    /// Indexes a poll that was just added to `room_id`.
    ///
    /// The caller must hold the room's lock.
    pub fn index_poll(&self, room_id: &RoomId, poll_id: PollId) {
        self.polls.insert(poll_id, room_id.clone());
    }

    /// Removes a room and every index key pointing into it.
    ///
    /// The caller must hold the room's lock and pass the locked entry, so
    /// nothing can be added to the room while its keys are being removed.
    /// Secondary keys go first; the room id is freed last.
    /// Returns `true` if the room was registered.
    pub fn remove(&self, entry: &RoomEntry) -> bool {
        for participant_id in entry.participant_ids() {
            self.participants.remove(&participant_id);
        }
        for token in entry.participant_tokens() {
            self.tokens.remove(token);
        }
        for poll_id in entry.poll_ids() {
            self.polls.remove(&poll_id);
        }
        self.rooms.remove(&entry.room_id).is_some()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::room::Participant;

    fn room_id(raw: &str) -> RoomId {
        let Ok(id) = RoomId::parse(raw) else {
            panic!("valid room id");
        };
        id
    }

    #[test]
    fn create_and_get() {
        let registry = RoomRegistry::new();
        let Ok((id, _)) = registry.create(Some(room_id("TEAM01")), "Olu") else {
            panic!("create failed");
        };
        assert_eq!(id.as_str(), "TEAM01");
        assert!(registry.room(&id).is_ok());
    }

    #[test]
    fn duplicate_custom_id_is_rejected_case_insensitively() {
        let registry = RoomRegistry::new();
        assert!(registry.create(Some(room_id("ab1")), "Olu").is_ok());
        let result = registry.create(Some(room_id("AB1")), "Eve");
        assert!(matches!(result, Err(EngineError::DuplicateRoomId(_))));
    }

    #[test]
    fn generated_ids_are_unique() {
        let registry = RoomRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let Ok((id, _)) = registry.create(None, "Olu") else {
                panic!("create failed");
            };
            assert!(seen.insert(id));
        }
        assert_eq!(registry.len(), 50);
    }

    #[test]
    fn get_nonexistent_returns_error() {
        let registry = RoomRegistry::new();
        let result = registry.room(&room_id("NOPE1"));
        assert!(matches!(result, Err(EngineError::RoomNotFound(_))));
        assert!(registry.room_of_poll(PollId::new()).is_err());
        assert!(registry.room_of_token(&ParticipantToken::generate()).is_err());
    }

    #[test]
    fn concurrent_claims_of_one_id_have_one_winner() {
        let registry = Arc::new(RoomRegistry::new());
        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    s.spawn(move || registry.create(Some(room_id("RACE1")), "Olu").is_ok())
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().ok())
                .filter(|won| *won)
                .count()
        });
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn remove_clears_all_indexes() {
        let registry = RoomRegistry::new();
        let Ok((id, handle)) = registry.create(None, "Olu") else {
            panic!("create failed");
        };
        let participant = Participant::new("A".to_string());
        let (pid, token) = (participant.participant_id, participant.token.clone());
        let poll_id = PollId::new();
        {
            let mut entry = handle.lock().await;
            entry.add_participant(participant);
            registry.index_participant(&id, pid, token.clone());
            registry.index_poll(&id, poll_id);
        }
        assert!(registry.room_of_participant(pid).is_ok());
        assert!(registry.room_of_token(&token).is_ok());

        let entry = handle.lock().await;
        assert!(registry.remove(&entry));
        drop(entry);

        assert!(registry.room(&id).is_err());
        assert!(registry.room_of_participant(pid).is_err());
        assert!(registry.room_of_token(&token).is_err());
        assert!(matches!(registry.room_of_poll(poll_id), Err(EngineError::PollNotFound(_))));
        assert_eq!(registry.len(), 0);
    }
}
