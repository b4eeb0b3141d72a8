//! Poll service: the poll engine.
//!
//! Drives each poll through `created → active → closed`, records votes in
//! the poll's ledger, arms and disarms auto-stop timers, and publishes the
//! matching [`RoomEvent`]s. All of it happens under the owning room's lock,
//! which is also where timer-driven stops land; a timer racing a manual
//! stop is resolved by the poll state machine, not by the scheduler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::room_service::lookup_id;
use super::timer_scheduler::{TimerEvents, TimerScheduler};
use crate::domain::{
    ApprovalStatus, BroadcastHub, ParticipantToken, PollDraft, PollEntry, PollId, PollState,
    PollView, RoomEvent, RoomRegistry, StopCause, StopOutcome,
};
use crate::error::EngineError;

/// Acknowledgement of an accepted vote. Says nothing about the choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Poll the vote was recorded in.
    pub poll_id: PollId,
    /// When the vote was accepted.
    pub recorded_at: DateTime<Utc>,
}

/// Orchestration layer for poll lifecycle and voting.
#[derive(Debug, Clone)]
pub struct PollService {
    registry: Arc<RoomRegistry>,
    hub: BroadcastHub,
    scheduler: TimerScheduler,
    max_timer_minutes: f64,
}

impl PollService {
    /// Creates a new `PollService`.
    #[must_use]
    pub fn new(
        registry: Arc<RoomRegistry>,
        hub: BroadcastHub,
        scheduler: TimerScheduler,
        max_timer_minutes: f64,
    ) -> Self {
        Self {
            registry,
            hub,
            scheduler,
            max_timer_minutes,
        }
    }

    /// Returns the timer scheduler used for auto-stop deadlines.
    #[must_use]
    pub fn scheduler(&self) -> &TimerScheduler {
        &self.scheduler
    }

    /// Spawns the task that turns fired timers into timer-caused stops.
    ///
    /// Each fired timer stops its poll on its own task, so a room whose
    /// lock is busy delays only its own polls. The driver keeps its own
    /// handle to the service and runs until the runtime shuts down.
    #[must_use]
    pub fn spawn_timer_driver(&self, mut events: TimerEvents) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(poll_id) = events.next().await {
                let service = service.clone();
                tokio::spawn(async move { service.stop_on_timer(poll_id).await });
            }
            tracing::debug!("timer driver stopped");
        })
    }

    async fn stop_on_timer(&self, poll_id: PollId) {
        match self.stop(poll_id, StopCause::Timer).await {
            Ok((StopOutcome::Closed, _)) => {}
            Ok((StopOutcome::AlreadyClosed, _)) => {
                tracing::debug!(%poll_id, "timer fired on closed poll, ignored");
            }
            Err(EngineError::PollNotFound(_)) => {
                tracing::debug!(%poll_id, "timer fired for a purged poll, ignored");
            }
            Err(e) => {
                tracing::warn!(%poll_id, error = %e, "timer-driven stop failed");
            }
        }
    }

    /// Creates a poll in the `created` state. Emits no event.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidPoll`] for a bad question, options or timer.
    /// - [`EngineError::RoomNotFound`] if the room does not exist.
    pub async fn create(
        &self,
        room_id: &str,
        question: &str,
        options: &[String],
        timer_minutes: Option<f64>,
    ) -> Result<PollView, EngineError> {
        let room_id = lookup_id(room_id)?;
        let draft = PollDraft::new(question, options, timer_minutes, self.max_timer_minutes)?;

        let handle = self.registry.room(&room_id)?;
        let mut entry = handle.lock().await;
        entry.ensure_live()?;

        let view = entry.add_poll(PollEntry::new(room_id.clone(), draft));
        self.registry.index_poll(&room_id, view.poll_id);

        tracing::info!(%room_id, poll_id = %view.poll_id, options = view.options.len(), "poll created");
        Ok(view)
    }

    /// Opens a poll for voting and arms its timer, if any.
    ///
    /// # Errors
    ///
    /// - [`EngineError::PollNotFound`] if the poll does not exist.
    /// - [`EngineError::InvalidTransition`] unless the poll is `created`.
    pub async fn start(&self, poll_id: PollId) -> Result<PollView, EngineError> {
        let handle = self.registry.room_of_poll(poll_id)?;
        let mut entry = handle.lock().await;
        let poll = entry.poll_mut(poll_id)?;
        poll.start(Utc::now())?;

        if let Some(timer) = poll.timer() {
            self.scheduler.schedule(poll_id, Instant::now() + timer);
        }

        self.hub.publish(RoomEvent::PollStarted {
            room_id: poll.room_id.clone(),
            poll_id,
            question: poll.question.clone(),
            options: poll.options.clone(),
            timer_minutes: poll.timer_minutes,
            closes_at: poll.closes_at(),
            timestamp: Utc::now(),
        });

        tracing::info!(room_id = %poll.room_id, %poll_id, timer_minutes = ?poll.timer_minutes, "poll started");
        Ok(poll.view())
    }

    /// Closes an active poll and freezes its tally.
    ///
    /// Manual stops and fired timers both come through here. Whichever
    /// reaches the room lock first closes the poll; a timer arriving second
    /// gets [`StopOutcome::AlreadyClosed`] and emits nothing.
    ///
    /// # Errors
    ///
    /// - [`EngineError::PollNotFound`] if the poll does not exist.
    /// - [`EngineError::InvalidTransition`] if the poll is not `active`
    ///   (except the timer case above).
    pub async fn stop(
        &self,
        poll_id: PollId,
        cause: StopCause,
    ) -> Result<(StopOutcome, PollView), EngineError> {
        let handle = self.registry.room_of_poll(poll_id)?;
        let mut entry = handle.lock().await;
        let poll = entry.poll_mut(poll_id)?;
        let outcome = poll.stop(cause, Utc::now())?;
        if outcome == StopOutcome::AlreadyClosed {
            return Ok((outcome, poll.view()));
        }

        self.scheduler.cancel(poll_id);

        let room_id = poll.room_id.clone();
        let vote_counts = poll.tally();
        let total_votes = vote_counts.total();
        let timestamp = Utc::now();
        let event = match cause {
            StopCause::Manual => RoomEvent::PollStopped {
                room_id: room_id.clone(),
                poll_id,
                vote_counts,
                total_votes,
                timestamp,
            },
            StopCause::Timer => RoomEvent::PollAutoStopped {
                room_id: room_id.clone(),
                poll_id,
                vote_counts,
                total_votes,
                timestamp,
            },
        };
        self.hub.publish(event);

        tracing::info!(%room_id, %poll_id, %cause, total_votes, "poll closed");
        Ok((outcome, poll.view()))
    }

    /// Casts one anonymous vote.
    ///
    /// Checks run in this order: token, poll existence, poll active,
    /// participant approved, then the ledger (option, duplicate).
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidToken`] if the token is unknown.
    /// - [`EngineError::PollNotFound`] if the poll is not in the voter's room.
    /// - [`EngineError::PollNotActive`] unless the poll is `active`.
    /// - [`EngineError::ParticipantNotApproved`] unless the voter is approved.
    /// - [`EngineError::InvalidOption`] if `option` is not one of the poll's.
    /// - [`EngineError::AlreadyVoted`] if the voter already voted in this poll.
    pub async fn vote(
        &self,
        poll_id: PollId,
        token: &ParticipantToken,
        option: &str,
    ) -> Result<VoteReceipt, EngineError> {
        let handle = self.registry.room_of_token(token)?;
        let mut entry = handle.lock().await;

        let (participant_id, approval_status) = entry
            .participant_by_token(token)
            .map(|p| (p.participant_id, p.approval_status))
            .ok_or(EngineError::InvalidToken)?;

        let poll = entry.poll_mut(poll_id)?;
        if poll.state() != PollState::Active {
            return Err(EngineError::PollNotActive(poll_id));
        }
        if approval_status != ApprovalStatus::Approved {
            return Err(EngineError::ParticipantNotApproved);
        }

        let vote_counts = poll.vote(participant_id, option)?;
        let room_id = poll.room_id.clone();
        let recorded_at = Utc::now();
        self.hub.publish(RoomEvent::VoteUpdate {
            room_id: room_id.clone(),
            poll_id,
            total_votes: vote_counts.total(),
            vote_counts,
            timestamp: recorded_at,
        });

        tracing::info!(%room_id, %poll_id, "vote recorded");
        Ok(VoteReceipt {
            poll_id,
            recorded_at,
        })
    }

    /// Polls of a room in creation order, with live or frozen tallies.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RoomNotFound`] if the room does not exist.
    pub async fn list_polls(&self, room_id: &str) -> Result<Vec<PollView>, EngineError> {
        let room_id = lookup_id(room_id)?;
        let handle = self.registry.room(&room_id)?;
        let entry = handle.lock().await;
        entry.ensure_live()?;
        Ok(entry.polls())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast;

    use super::*;
    use crate::domain::{ApprovalStatus, RoomId};
    use crate::service::RoomService;

    struct Engine {
        rooms: RoomService,
        polls: PollService,
        hub: BroadcastHub,
        _driver: JoinHandle<()>,
    }

    fn engine() -> Engine {
        let registry = Arc::new(RoomRegistry::new());
        let hub = BroadcastHub::new(256);
        let (scheduler, events) = TimerScheduler::new();
        let rooms = RoomService::new(Arc::clone(&registry), hub.clone());
        let polls = PollService::new(registry, hub.clone(), scheduler, 1440.0);
        let driver = polls.spawn_timer_driver(events);
        Engine {
            rooms,
            polls,
            hub,
            _driver: driver,
        }
    }

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    impl Engine {
        async fn room(&self, id: &str) -> RoomId {
            let Ok(status) = self.rooms.create_room("Olu", Some(id)).await else {
                panic!("create_room failed");
            };
            status.room_id
        }

        async fn approved_voter(&self, room: &str, name: &str) -> ParticipantToken {
            let Ok(joined) = self.rooms.join(room, name).await else {
                panic!("join failed");
            };
            if self.rooms.approve(joined.participant.participant_id).await.is_err() {
                panic!("approve failed");
            }
            joined.token
        }

        async fn poll(&self, room: &str, timer: Option<f64>) -> PollId {
            let Ok(view) = self
                .polls
                .create(room, "Pick a color", &opts(&["Red", "Blue"]), timer)
                .await
            else {
                panic!("create poll failed");
            };
            view.poll_id
        }

        fn subscribe(&self, room_id: &RoomId) -> broadcast::Receiver<RoomEvent> {
            let Some(rx) = self.hub.subscribe(room_id) else {
                panic!("room channel missing");
            };
            rx
        }
    }

    fn drain(rx: &mut broadcast::Receiver<RoomEvent>) -> Vec<RoomEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn team01_scenario() {
        let e = engine();
        e.room("TEAM01").await;
        let a = e.approved_voter("TEAM01", "A").await;
        let b = e.approved_voter("TEAM01", "B").await;
        let c = e.approved_voter("TEAM01", "C").await;

        let poll_id = e.poll("TEAM01", None).await;
        assert!(e.polls.start(poll_id).await.is_ok());

        for (token, choice) in [(&a, "Red"), (&b, "Blue"), (&c, "Red")] {
            assert!(e.polls.vote(poll_id, token, choice).await.is_ok());
        }
        assert_eq!(
            e.polls.vote(poll_id, &c, "Blue").await,
            Err(EngineError::AlreadyVoted)
        );

        let Ok((StopOutcome::Closed, view)) = e.polls.stop(poll_id, StopCause::Manual).await else {
            panic!("stop failed");
        };
        assert_eq!(view.state, PollState::Closed);
        assert_eq!(view.vote_counts.get("Red"), Some(2));
        assert_eq!(view.vote_counts.get("Blue"), Some(1));
        assert_eq!(view.total_votes, 3);

        let Ok(listed) = e.polls.list_polls("TEAM01").await else {
            panic!("list_polls failed");
        };
        let Some(first) = listed.first() else {
            panic!("poll missing from listing");
        };
        assert_eq!(first.total_votes, 3);
        assert_eq!(first.state, PollState::Closed);
    }

    #[tokio::test]
    async fn vote_checks_run_in_order() {
        let e = engine();
        e.room("TEAM01").await;
        let approved = e.approved_voter("TEAM01", "A").await;
        let Ok(pending) = e.rooms.join("TEAM01", "P").await else {
            panic!("join failed");
        };
        let poll_id = e.poll("TEAM01", None).await;

        assert_eq!(
            e.polls
                .vote(poll_id, &ParticipantToken::generate(), "Red")
                .await,
            Err(EngineError::InvalidToken)
        );
        assert!(matches!(
            e.polls.vote(PollId::new(), &approved, "Red").await,
            Err(EngineError::PollNotFound(_))
        ));
        assert_eq!(
            e.polls.vote(poll_id, &approved, "Red").await,
            Err(EngineError::PollNotActive(poll_id))
        );

        assert!(e.polls.start(poll_id).await.is_ok());
        assert_eq!(
            e.polls.vote(poll_id, &pending.token, "Red").await,
            Err(EngineError::ParticipantNotApproved)
        );
        assert!(matches!(
            e.polls.vote(poll_id, &approved, "Green").await,
            Err(EngineError::InvalidOption(_))
        ));
        assert!(e.polls.vote(poll_id, &approved, "Red").await.is_ok());
    }

    #[tokio::test]
    async fn denied_participant_never_reaches_the_ledger() {
        let e = engine();
        e.room("TEAM01").await;
        let Ok(denied) = e.rooms.join("TEAM01", "D").await else {
            panic!("join failed");
        };
        let participant_id = denied.participant.participant_id;
        if e.rooms.deny(participant_id).await.is_err() {
            panic!("deny failed");
        }
        // Approval after a denial is a no-op.
        let Ok(view) = e.rooms.approve(participant_id).await else {
            panic!("approve failed");
        };
        assert_eq!(view.approval_status, ApprovalStatus::Denied);

        let poll_id = e.poll("TEAM01", None).await;
        assert!(e.polls.start(poll_id).await.is_ok());
        for choice in ["Red", "Blue"] {
            assert_eq!(
                e.polls.vote(poll_id, &denied.token, choice).await,
                Err(EngineError::ParticipantNotApproved)
            );
        }

        let Ok(listed) = e.polls.list_polls("TEAM01").await else {
            panic!("list_polls failed");
        };
        let Some(poll) = listed.first() else {
            panic!("poll missing from listing");
        };
        assert_eq!(poll.total_votes, 0);
        assert_eq!(poll.vote_counts.get("Red"), Some(0));
        assert_eq!(poll.vote_counts.get("Blue"), Some(0));
    }

    #[tokio::test]
    async fn unknown_poll_vote_is_not_found() {
        let e = engine();
        e.room("TEAM01").await;
        let voter = e.approved_voter("TEAM01", "A").await;
        assert!(matches!(
            e.polls.vote(PollId::new(), &voter, "Red").await,
            Err(EngineError::PollNotFound(_))
        ));
    }

    #[tokio::test]
    async fn poll_from_other_room_is_not_found() {
        let e = engine();
        e.room("ROOMA").await;
        e.room("ROOMB").await;
        let voter = e.approved_voter("ROOMA", "A").await;
        let foreign = e.poll("ROOMB", None).await;
        assert!(e.polls.start(foreign).await.is_ok());
        assert!(matches!(
            e.polls.vote(foreign, &voter, "Red").await,
            Err(EngineError::PollNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_from_one_token_count_once() {
        let e = engine();
        e.room("TEAM01").await;
        let token = e.approved_voter("TEAM01", "A").await;
        let poll_id = e.poll("TEAM01", None).await;
        assert!(e.polls.start(poll_id).await.is_ok());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let polls = e.polls.clone();
                let token = token.clone();
                let choice = if i % 2 == 0 { "Red" } else { "Blue" };
                tokio::spawn(async move { polls.vote(poll_id, &token, choice).await })
            })
            .collect();

        let mut accepted = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await {
                Ok(Ok(_)) => accepted += 1,
                Ok(Err(EngineError::AlreadyVoted)) => duplicates += 1,
                other => panic!("unexpected vote result: {other:?}"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 31);

        let Ok(polls) = e.polls.list_polls("TEAM01").await else {
            panic!("list_polls failed");
        };
        assert_eq!(polls.first().map(|p| p.total_votes), Some(1));
    }

    #[tokio::test]
    async fn lifecycle_transitions_are_enforced() {
        let e = engine();
        e.room("TEAM01").await;
        let poll_id = e.poll("TEAM01", None).await;

        assert!(matches!(
            e.polls.stop(poll_id, StopCause::Manual).await,
            Err(EngineError::InvalidTransition { from: PollState::Created, .. })
        ));
        assert!(e.polls.start(poll_id).await.is_ok());
        assert!(matches!(
            e.polls.start(poll_id).await,
            Err(EngineError::InvalidTransition { from: PollState::Active, .. })
        ));
        assert!(e.polls.stop(poll_id, StopCause::Manual).await.is_ok());
        assert!(matches!(
            e.polls.start(poll_id).await,
            Err(EngineError::InvalidTransition { from: PollState::Closed, .. })
        ));
        assert!(matches!(
            e.polls.start(PollId::new()).await,
            Err(EngineError::PollNotFound(_))
        ));
    }

    #[tokio::test]
    async fn start_and_vote_emit_events() {
        let e = engine();
        let room_id = e.room("TEAM01").await;
        let voter = e.approved_voter("TEAM01", "A").await;
        let poll_id = e.poll("TEAM01", None).await;
        let mut rx = e.subscribe(&room_id);

        assert!(e.polls.start(poll_id).await.is_ok());
        assert!(e.polls.vote(poll_id, &voter, "Blue").await.is_ok());

        let events = drain(&mut rx);
        let types: Vec<_> = events.iter().map(RoomEvent::event_type_str).collect();
        assert_eq!(types, vec!["poll_started", "vote_update"]);
        let Some(RoomEvent::VoteUpdate {
            vote_counts,
            total_votes,
            ..
        }) = events.get(1)
        else {
            panic!("expected vote_update");
        };
        assert_eq!(vote_counts.get("Blue"), Some(1));
        assert_eq!(*total_votes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_auto_stops_poll() {
        let e = engine();
        let room_id = e.room("TEAM01").await;
        let poll_id = e.poll("TEAM01", Some(0.02)).await;
        let mut rx = e.subscribe(&room_id);

        let Ok(view) = e.polls.start(poll_id).await else {
            panic!("start failed");
        };
        assert!(view.closes_at.is_some());
        assert!(e.polls.scheduler().is_pending(poll_id));

        let Ok(RoomEvent::PollStarted { .. }) = rx.recv().await else {
            panic!("expected poll_started");
        };
        let Ok(RoomEvent::PollAutoStopped {
            poll_id: stopped, ..
        }) = rx.recv().await
        else {
            panic!("expected poll_auto_stopped");
        };
        assert_eq!(stopped, poll_id);

        let Ok(polls) = e.polls.list_polls("TEAM01").await else {
            panic!("list_polls failed");
        };
        assert_eq!(polls.first().map(|p| p.state), Some(PollState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_stop_cancels_timer() {
        let e = engine();
        let room_id = e.room("TEAM01").await;
        let poll_id = e.poll("TEAM01", Some(1.0)).await;
        assert!(e.polls.start(poll_id).await.is_ok());
        let mut rx = e.subscribe(&room_id);

        assert!(e.polls.stop(poll_id, StopCause::Manual).await.is_ok());
        assert!(!e.polls.scheduler().is_pending(poll_id));

        tokio::time::sleep(Duration::from_secs(120)).await;
        let types: Vec<_> = drain(&mut rx).iter().map(RoomEvent::event_type_str).collect();
        assert_eq!(types, vec!["poll_stopped"]);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_stop_racing_timer_closes_once() {
        let e = engine();
        let room_id = e.room("TEAM01").await;
        let poll_id = e.poll("TEAM01", Some(1.0)).await;
        assert!(e.polls.start(poll_id).await.is_ok());
        let mut rx = e.subscribe(&room_id);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let manual = e.polls.stop(poll_id, StopCause::Manual).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let stops: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|ev| {
                matches!(
                    ev,
                    RoomEvent::PollStopped { .. } | RoomEvent::PollAutoStopped { .. }
                )
            })
            .collect();
        assert_eq!(stops.len(), 1);
        match stops.first() {
            Some(RoomEvent::PollStopped { .. }) => assert!(manual.is_ok()),
            Some(RoomEvent::PollAutoStopped { .. }) => assert!(matches!(
                manual,
                Err(EngineError::InvalidTransition { from: PollState::Closed, .. })
            )),
            other => panic!("unexpected stop event: {other:?}"),
        }

        let Ok(polls) = e.polls.list_polls("TEAM01").await else {
            panic!("list_polls failed");
        };
        assert_eq!(polls.first().map(|p| p.state), Some(PollState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn late_timer_stop_is_noop() {
        let e = engine();
        e.room("TEAM01").await;
        let poll_id = e.poll("TEAM01", Some(1.0)).await;
        assert!(e.polls.start(poll_id).await.is_ok());
        assert!(e.polls.stop(poll_id, StopCause::Manual).await.is_ok());

        let Ok((outcome, view)) = e.polls.stop(poll_id, StopCause::Timer).await else {
            panic!("timer stop on closed poll should not fail");
        };
        assert_eq!(outcome, StopOutcome::AlreadyClosed);
        assert_eq!(view.closed_by, Some(StopCause::Manual));
    }

    #[tokio::test]
    async fn create_rejects_invalid_polls() {
        let e = engine();
        e.room("TEAM01").await;
        assert!(matches!(
            e.polls.create("TEAM01", "Q", &opts(&["Only"]), None).await,
            Err(EngineError::InvalidPoll(_))
        ));
        assert!(matches!(
            e.polls.create("TEAM01", "Q", &opts(&["A", "B"]), Some(5000.0)).await,
            Err(EngineError::InvalidPoll(_))
        ));
        assert!(matches!(
            e.polls.create("NOPE1", "Q", &opts(&["A", "B"]), None).await,
            Err(EngineError::RoomNotFound(_))
        ));
    }
}
