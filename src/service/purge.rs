//! Purge coordinator: irreversible, all-or-nothing room deletion.
//!
//! A purge runs entirely under the room's lock:
//!
//! 1. erase the room's journal entries (the only step that can fail),
//! 2. cancel pending poll timers,
//! 3. drop the room and its index keys from the registry,
//! 4. clear the entry and mark it purged,
//! 5. close the room's broadcast channel.
//!
//! If step 1 fails nothing has been touched and the caller is told to
//! retry. Steps 2-5 cannot fail, so a successful purge leaves no residue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::room_service::lookup_id;
use super::timer_scheduler::TimerScheduler;
use crate::domain::{BroadcastHub, RoomId, RoomRegistry};
use crate::error::EngineError;

/// What a purge removed.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    /// Purged room.
    pub room_id: RoomId,
    /// Participants removed.
    pub participants_removed: usize,
    /// Polls removed.
    pub polls_removed: usize,
    /// Ledger entries (votes) removed.
    pub votes_removed: usize,
    /// Pending timers cancelled.
    pub timers_cancelled: usize,
    /// Journal entries erased.
    pub journal_entries_erased: u64,
    /// When the purge completed.
    pub purged_at: DateTime<Utc>,
}

/// Deletes rooms and everything they own.
#[derive(Debug, Clone)]
pub struct PurgeCoordinator {
    registry: Arc<RoomRegistry>,
    hub: BroadcastHub,
    scheduler: TimerScheduler,
}

impl PurgeCoordinator {
    /// Creates a new `PurgeCoordinator`.
    #[must_use]
    pub fn new(registry: Arc<RoomRegistry>, hub: BroadcastHub, scheduler: TimerScheduler) -> Self {
        Self {
            registry,
            hub,
            scheduler,
        }
    }

    /// Purges a room.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RoomNotFound`] if the room does not exist (or was
    ///   already purged).
    /// - [`EngineError::PurgeFailed`] if the journal could not be erased;
    ///   the room is left intact and the call may be retried.
    pub async fn purge(&self, room_id: &str) -> Result<PurgeReport, EngineError> {
        let room_id = lookup_id(room_id)?;
        let handle = self.registry.room(&room_id)?;
        let mut entry = handle.lock().await;
        entry.ensure_live()?;

        let journal_entries_erased = self
            .hub
            .journal()
            .erase(&room_id)
            .await
            .map_err(|e| {
                tracing::warn!(%room_id, error = %e, "purge aborted, room left intact");
                EngineError::PurgeFailed(e.to_string())
            })?;

        let timers_cancelled = entry
            .poll_ids()
            .filter(|poll_id| self.scheduler.cancel(*poll_id))
            .count();

        let status = entry.status();
        let votes_removed = entry.vote_count();
        // Close the channel before freeing the id: a room re-created under
        // the same id must open a fresh one.
        self.hub.close(&room_id);
        self.registry.remove(&entry);
        entry.clear();
        drop(entry);

        tracing::info!(
            %room_id,
            participants = status.participant_count,
            polls = status.poll_count,
            timers_cancelled,
            "room purged"
        );
        Ok(PurgeReport {
            room_id,
            participants_removed: status.participant_count,
            polls_removed: status.poll_count,
            votes_removed,
            timers_cancelled,
            journal_entries_erased,
            purged_at: Utc::now(),
        })
    }
}
