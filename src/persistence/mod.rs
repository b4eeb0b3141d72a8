//! Persistence layer: the room journal.
//!
//! The engine is written against the [`JournalStore`] contract. A single
//! writer task owns the store and drains a bounded queue of
//! [`JournalCommand`]s in FIFO order, so an erase issued by the purge
//! coordinator always lands after every append that preceded it.
//!
//! Only broadcast envelopes are journaled. They carry tallies, never
//! per-participant choices.

pub mod models;
pub mod postgres;

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::{RoomEvent, RoomId};
use crate::error::EngineError;

pub use models::NewJournalEntry;
pub use postgres::PostgresJournal;

/// Repository contract for room-scoped durable storage.
pub trait JournalStore: Send + Sync + 'static {
    /// Appends one entry.
    fn append(
        &self,
        entry: &NewJournalEntry,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Deletes every entry for `room_id`, returning how many were removed.
    fn erase_room(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<u64, EngineError>> + Send;
}

/// Commands processed by the journal writer task.
#[derive(Debug)]
pub enum JournalCommand {
    /// Append an event.
    Append(NewJournalEntry),
    /// Erase a room and report the outcome.
    Erase {
        /// Room to erase.
        room_id: RoomId,
        /// Response channel for the erase result.
        respond_to: oneshot::Sender<Result<u64, EngineError>>,
    },
}

/// Handle to the journal writer. Cheap to clone.
///
/// A disabled journal drops appends and erases trivially.
#[derive(Debug, Clone)]
pub struct RoomJournal {
    tx: Option<mpsc::Sender<JournalCommand>>,
}

impl RoomJournal {
    /// A journal that records nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Spawns the writer task for `store` and returns its handle.
    #[must_use]
    pub fn spawn<S: JournalStore>(store: S, queue_capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let task = tokio::spawn(run_writer(store, rx));
        (Self { tx: Some(tx) }, task)
    }

    /// Returns `true` if a writer is attached.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues an event for the journal without waiting.
    ///
    /// A full or closed queue drops the entry with a warning; journaling
    /// never fails the mutation that produced the event.
    pub fn record(&self, event: &RoomEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        let entry = match NewJournalEntry::from_event(event) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode journal entry");
                return;
            }
        };
        if let Err(e) = tx.try_send(JournalCommand::Append(entry)) {
            tracing::warn!(
                room_id = %event.room_id(),
                event_type = event.event_type_str(),
                error = %e,
                "journal append dropped"
            );
        }
    }

    /// Erases every journal entry for `room_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] if the writer has stopped or the
    /// store rejects the delete.
    pub async fn erase(&self, room_id: &RoomId) -> Result<u64, EngineError> {
        let Some(tx) = &self.tx else {
            return Ok(0);
        };
        let (respond_to, response) = oneshot::channel();
        tx.send(JournalCommand::Erase {
            room_id: room_id.clone(),
            respond_to,
        })
        .await
        .map_err(|_| EngineError::Unavailable("journal writer stopped".to_string()))?;
        response
            .await
            .map_err(|_| EngineError::Unavailable("journal writer dropped the request".to_string()))?
    }
}

/// Drains journal commands until every handle is dropped.
async fn run_writer<S: JournalStore>(store: S, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            JournalCommand::Append(entry) => {
                if let Err(e) = store.append(&entry).await {
                    tracing::warn!(room_id = %entry.room_id, error = %e, "journal append failed");
                }
            }
            JournalCommand::Erase {
                room_id,
                respond_to,
            } => {
                let result = store.erase_room(&room_id).await;
                if let Err(e) = &result {
                    tracing::warn!(%room_id, error = %e, "journal erase failed");
                }
                let _ = respond_to.send(result);
            }
        }
    }
    tracing::debug!("journal writer stopped");
}


#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::Utc;

    use super::testing::MemoryJournal;
    use super::*;

    fn event(room: &str) -> RoomEvent {
        let Ok(room_id) = RoomId::parse(room) else {
            panic!("valid room id");
        };
        RoomEvent::ParticipantUpdate {
            room_id,
            participant_count: 1,
            approved_count: 0,
            pending_count: 1,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn disabled_journal_erases_trivially() {
        let journal = RoomJournal::disabled();
        journal.record(&event("ROOM1"));
        let Ok(room_id) = RoomId::parse("ROOM1") else {
            panic!("valid room id");
        };
        assert_eq!(journal.erase(&room_id).await, Ok(0));
        assert!(!journal.is_enabled());
    }

    #[tokio::test]
    async fn erase_observes_earlier_appends() {
        let store = MemoryJournal::default();
        let (journal, _task) = RoomJournal::spawn(store.clone(), 16);
        journal.record(&event("ROOM1"));
        journal.record(&event("ROOM1"));
        journal.record(&event("ROOM2"));

        let Ok(room_id) = RoomId::parse("ROOM1") else {
            panic!("valid room id");
        };
        assert_eq!(journal.erase(&room_id).await, Ok(2));
        assert_eq!(store.count_for(&room_id), 0);
        let Ok(other) = RoomId::parse("ROOM2") else {
            panic!("valid room id");
        };
        assert_eq!(store.count_for(&other), 1);
    }

    #[tokio::test]
    async fn failing_store_reports_unavailable() {
        let store = MemoryJournal::default();
        store.fail_erase.store(true, Ordering::SeqCst);
        let (journal, _task) = RoomJournal::spawn(store, 16);
        let Ok(room_id) = RoomId::parse("ROOM1") else {
            panic!("valid room id");
        };
        assert!(matches!(
            journal.erase(&room_id).await,
            Err(EngineError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn stopped_writer_reports_unavailable() {
        let store = MemoryJournal::default();
        let (journal, task) = RoomJournal::spawn(store, 16);
        task.abort();
        let _ = task.await;
        let Ok(room_id) = RoomId::parse("ROOM1") else {
            panic!("valid room id");
        };
        assert!(matches!(
            journal.erase(&room_id).await,
            Err(EngineError::Unavailable(_))
        ));
    }
}
