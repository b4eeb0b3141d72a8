//! Poll aggregate and its `created → active → closed` state machine.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::vote_ledger::{Tally, VoteLedger};
use super::{ParticipantId, PollId, RoomId};
use crate::error::EngineError;

/// Maximum question length in characters.
pub const MAX_QUESTION_LEN: usize = 500;

/// Maximum option length in characters.
pub const MAX_OPTION_LEN: usize = 200;

/// Minimum number of options.
pub const MIN_OPTIONS: usize = 2;

/// Maximum number of options.
pub const MAX_OPTIONS: usize = 20;

/// Lifecycle state of a poll. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// Created but not yet accepting votes.
    Created,
    /// Accepting votes.
    Active,
    /// Stopped; the tally is frozen.
    Closed,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Closed => "closed",
        })
    }
}

/// What closed a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    /// The organizer stopped the poll.
    Manual,
    /// The poll's timer expired.
    Timer,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Timer => "timer",
        })
    }
}

/// Result of a stop request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// This call closed the poll.
    Closed,
    /// A timer fired after the poll was already closed; nothing changed.
    AlreadyClosed,
}

/// Validated poll definition, ready to be inserted into a room.
#[derive(Debug, Clone)]
pub struct PollDraft {
    /// Trimmed question text.
    pub question: String,
    /// Trimmed, distinct options.
    pub options: Vec<String>,
    /// Optional auto-stop timer in minutes.
    pub timer_minutes: Option<f64>,
}

impl PollDraft {
    /// Validates raw poll input.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPoll`] if the question is blank or too
    /// long, there are fewer than two or more than twenty options, any
    /// option is blank, too long, or duplicated, or the timer is not a
    /// positive finite number no larger than `max_timer_minutes`.
    pub fn new(
        question: &str,
        options: &[String],
        timer_minutes: Option<f64>,
        max_timer_minutes: f64,
    ) -> Result<Self, EngineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::InvalidPoll("question must not be empty".to_string()));
        }
        if question.chars().count() > MAX_QUESTION_LEN {
            return Err(EngineError::InvalidPoll(format!(
                "question exceeds {MAX_QUESTION_LEN} characters"
            )));
        }
        if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
            return Err(EngineError::InvalidPoll(format!(
                "a poll needs {MIN_OPTIONS}-{MAX_OPTIONS} options, got {}",
                options.len()
            )));
        }

        let mut cleaned: Vec<String> = Vec::with_capacity(options.len());
        for raw in options {
            let option = raw.trim();
            if option.is_empty() {
                return Err(EngineError::InvalidPoll("options must not be blank".to_string()));
            }
            if option.chars().count() > MAX_OPTION_LEN {
                return Err(EngineError::InvalidPoll(format!(
                    "option exceeds {MAX_OPTION_LEN} characters"
                )));
            }
            if cleaned.iter().any(|o| o == option) {
                return Err(EngineError::InvalidPoll(format!("duplicate option: {option}")));
            }
            cleaned.push(option.to_string());
        }

        if let Some(minutes) = timer_minutes
            && !(minutes.is_finite() && minutes > 0.0 && minutes <= max_timer_minutes)
        {
            return Err(EngineError::InvalidPoll(format!(
                "timer_minutes must be in (0, {max_timer_minutes}], got {minutes}"
            )));
        }

        Ok(Self {
            question: question.to_string(),
            options: cleaned,
            timer_minutes,
        })
    }

    /// Timer length as a [`Duration`], if a timer was requested.
    #[must_use]
    pub fn timer(&self) -> Option<Duration> {
        timer_duration(self.timer_minutes)
    }
}

fn timer_duration(timer_minutes: Option<f64>) -> Option<Duration> {
    timer_minutes.and_then(|m| Duration::try_from_secs_f64(m * 60.0).ok())
}

/// A poll owned by a room.
///
/// All transitions go through `&mut self` methods; the owning room's lock
/// linearizes them.
#[derive(Debug)]
pub struct PollEntry {
    /// Poll identifier.
    pub poll_id: PollId,
    /// Owning room.
    pub room_id: RoomId,
    /// Question text.
    pub question: String,
    /// Options in display order (immutable).
    pub options: Vec<String>,
    /// Optional auto-stop timer in minutes.
    pub timer_minutes: Option<f64>,
    state: PollState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
    closed_by: Option<StopCause>,
    ledger: VoteLedger,
}

impl PollEntry {
    /// Creates a poll in the `created` state.
    #[must_use]
    pub fn new(room_id: RoomId, draft: PollDraft) -> Self {
        let ledger = VoteLedger::new(&draft.options);
        Self {
            poll_id: PollId::new(),
            room_id,
            question: draft.question,
            options: draft.options,
            timer_minutes: draft.timer_minutes,
            state: PollState::Created,
            created_at: Utc::now(),
            started_at: None,
            closed_at: None,
            closes_at: None,
            closed_by: None,
            ledger,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PollState {
        self.state
    }

    /// Deadline of the auto-stop timer while the poll is active.
    #[must_use]
    pub const fn closes_at(&self) -> Option<DateTime<Utc>> {
        self.closes_at
    }

    /// Timer length as a [`Duration`], if the poll has one.
    #[must_use]
    pub fn timer(&self) -> Option<Duration> {
        timer_duration(self.timer_minutes)
    }

    /// Transitions `created → active`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless the poll is `created`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.state != PollState::Created {
            return Err(EngineError::InvalidTransition {
                poll_id: self.poll_id,
                from: self.state,
            });
        }
        self.state = PollState::Active;
        self.started_at = Some(now);
        self.closes_at = self
            .timer()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now + d);
        Ok(())
    }

    /// Transitions `active → closed` and freezes the ledger.
    ///
    /// A timer-caused stop on an already closed poll is a no-op that
    /// reports [`StopOutcome::AlreadyClosed`]; this is how a timer firing
    /// after a manual stop is absorbed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] if the poll is not
    /// `active`, except for the timer case above.
    pub fn stop(&mut self, cause: StopCause, now: DateTime<Utc>) -> Result<StopOutcome, EngineError> {
        match (self.state, cause) {
            (PollState::Active, _) => {
                self.state = PollState::Closed;
                self.closed_at = Some(now);
                self.closes_at = None;
                self.closed_by = Some(cause);
                self.ledger.seal();
                Ok(StopOutcome::Closed)
            }
            (PollState::Closed, StopCause::Timer) => Ok(StopOutcome::AlreadyClosed),
            (from, _) => Err(EngineError::InvalidTransition {
                poll_id: self.poll_id,
                from,
            }),
        }
    }

    /// Records a vote from an approved participant.
    ///
    /// # Errors
    ///
    /// - [`EngineError::PollNotActive`] unless the poll is `active`.
    /// - Ledger errors: [`EngineError::InvalidOption`], [`EngineError::AlreadyVoted`].
    pub fn vote(&mut self, participant_id: ParticipantId, option: &str) -> Result<Tally, EngineError> {
        if self.state != PollState::Active {
            return Err(EngineError::PollNotActive(self.poll_id));
        }
        self.ledger.record(participant_id, option)
    }

    /// Current tally snapshot.
    #[must_use]
    pub fn tally(&self) -> Tally {
        self.ledger.tally()
    }

    /// Number of distinct participants that voted.
    #[must_use]
    pub fn voter_count(&self) -> usize {
        self.ledger.voter_count()
    }

    /// Builds a read-only view of this poll.
    #[must_use]
    pub fn view(&self) -> PollView {
        let vote_counts = self.ledger.tally();
        PollView {
            poll_id: self.poll_id,
            room_id: self.room_id.clone(),
            question: self.question.clone(),
            options: self.options.clone(),
            timer_minutes: self.timer_minutes,
            state: self.state,
            created_at: self.created_at,
            started_at: self.started_at,
            closed_at: self.closed_at,
            closes_at: self.closes_at,
            closed_by: self.closed_by,
            total_votes: vote_counts.total(),
            vote_counts,
        }
    }
}

/// Snapshot of a poll for listings, responses and reports.
#[derive(Debug, Clone, Serialize)]
pub struct PollView {
    /// Poll identifier.
    pub poll_id: PollId,
    /// Owning room.
    pub room_id: RoomId,
    /// Question text.
    pub question: String,
    /// Options in display order.
    pub options: Vec<String>,
    /// Optional auto-stop timer in minutes.
    pub timer_minutes: Option<f64>,
    /// Current state.
    pub state: PollState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the poll was started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the poll was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Auto-stop deadline while active.
    pub closes_at: Option<DateTime<Utc>>,
    /// What closed the poll.
    pub closed_by: Option<StopCause>,
    /// Live (or frozen) counts per option.
    pub vote_counts: Tally,
    /// Sum of all counts.
    pub total_votes: u64,
}
