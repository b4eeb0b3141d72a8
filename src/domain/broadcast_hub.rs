//! Per-room broadcast channels for domain events.
//!
//! [`BroadcastHub`] keeps one [`tokio::sync::broadcast`] channel per room.
//! Services publish a [`RoomEvent`] after every accepted mutation while
//! still holding the room lock, so subscribers see events in the order the
//! mutations were accepted. Publishing never waits on subscribers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use super::{RoomEvent, RoomId};
use crate::persistence::RoomJournal;

/// Fan-out of [`RoomEvent`]s to each room's live subscribers.
///
/// Each channel is a ring buffer of `capacity` events. A subscriber that
/// falls further behind observes `Lagged` and is expected to reconnect and
/// re-fetch state. Dropped receivers are cleaned up by the channel itself.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    channels: Arc<RwLock<HashMap<RoomId, broadcast::Sender<RoomEvent>>>>,
    capacity: usize,
    journal: RoomJournal,
}

impl BroadcastHub {
    /// Creates a hub whose room channels hold `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_journal(capacity, RoomJournal::disabled())
    }

    /// Creates a hub that also forwards every event to `journal`.
    #[must_use]
    pub fn with_journal(capacity: usize, journal: RoomJournal) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
            journal,
        }
    }

    /// Returns the journal this hub forwards to.
    #[must_use]
    pub fn journal(&self) -> &RoomJournal {
        &self.journal
    }

    /// Opens the channel for a new room. Re-opening is a no-op.
    pub fn open(&self, room_id: &RoomId) {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
    }

    /// Publishes an event to the room's subscribers.
    ///
    /// Returns the number of receivers that got the event. Events for a
    /// room without a channel, or with no subscribers, are dropped.
    pub fn publish(&self, event: RoomEvent) -> usize {
        self.journal.record(&event);
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(event.room_id()) else {
            tracing::debug!(room_id = %event.room_id(), "publish to closed room dropped");
            return 0;
        };
        let event_type = event.event_type_str();
        let delivered = sender.send(event).unwrap_or(0);
        tracing::trace!(event_type, delivered, "event published");
        delivered
    }

    /// Subscribes to all future events of a room.
    ///
    /// Returns `None` if the room has no open channel.
    #[must_use]
    pub fn subscribe(&self, room_id: &RoomId) -> Option<broadcast::Receiver<RoomEvent>> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels.get(room_id).map(broadcast::Sender::subscribe)
    }

    /// Closes a room's channel. Subscribers drain what is buffered and then
    /// observe `Closed`.
    ///
    /// Returns `true` if a channel was open.
    pub fn close(&self, room_id: &RoomId) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels.remove(room_id).is_some()
    }

    /// Returns the number of live subscribers of a room.
    #[must_use]
    #[cfg(test)]
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(room_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Returns the number of open room channels.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
