//! One-shot auto-stop timers for polls.
//!
//! [`TimerScheduler`] runs one sleeping task per timed poll. When a task
//! wakes it reports the poll id on a channel; the timer driver
//! ([`super::PollService::spawn_timer_driver`]) turns each report into a
//! `stop(poll_id, timer)` call on the poll engine, which goes through the
//! same room lock as a manual stop.
//!
//! Cancelling aborts a task that has not woken yet. A task that already
//! woke cannot be recalled, so the poll engine treats a timer stop on a
//! closed poll as a no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::domain::PollId;

/// Receiving end of fired timers, consumed by the timer driver.
#[derive(Debug)]
pub struct TimerEvents {
    rx: mpsc::UnboundedReceiver<PollId>,
}

impl TimerEvents {
    /// Waits for the next fired timer. Returns `None` once every
    /// scheduler handle is gone.
    pub async fn next(&mut self) -> Option<PollId> {
        self.rx.recv().await
    }
}

/// Schedules and cancels per-poll deadlines. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TimerScheduler {
    pending: Arc<Mutex<HashMap<PollId, AbortHandle>>>,
    fired_tx: mpsc::UnboundedSender<PollId>,
}

impl TimerScheduler {
    /// Creates a scheduler and the event stream its timers report to.
    #[must_use]
    pub fn new() -> (Self, TimerEvents) {
        let (fired_tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            fired_tx,
        };
        (scheduler, TimerEvents { rx })
    }

    /// Registers a one-shot deadline for `poll_id`.
    ///
    /// Scheduling a poll that already has a pending timer replaces it.
    pub fn schedule(&self, poll_id: PollId, fire_at: Instant) {
        let pending = Arc::clone(&self.pending);
        let fired_tx = self.fired_tx.clone();

        // Hold the map lock across spawn + insert so a zero-delay task
        // cannot remove its entry before it exists.
        let mut map = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;
            pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&poll_id);
            if fired_tx.send(poll_id).is_err() {
                tracing::warn!(%poll_id, "timer fired with no driver running");
            } else {
                tracing::debug!(%poll_id, "poll timer fired");
            }
        });
        if let Some(previous) = map.insert(poll_id, task.abort_handle()) {
            previous.abort();
        }
    }

    /// Cancels the pending timer of `poll_id`.
    ///
    /// Returns `true` if a timer was still pending. Cancelling a timer that
    /// already fired, or never existed, is a no-op.
    pub fn cancel(&self, poll_id: PollId) -> bool {
        let handle = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&poll_id);
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::debug!(%poll_id, "poll timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `poll_id` has a timer that has not fired yet.
    #[must_use]
    #[cfg(test)]
    pub fn is_pending(&self, poll_id: PollId) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&poll_id)
    }

    /// Number of timers that have not fired yet.
    #[must_use]
    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_at_deadline() {
        let (scheduler, mut events) = TimerScheduler::new();
        let poll_id = PollId::new();
        scheduler.schedule(poll_id, Instant::now() + Duration::from_secs(60));
        assert!(scheduler.is_pending(poll_id));

        assert_eq!(events.next().await, Some(poll_id));
        assert!(!scheduler.is_pending(poll_id));

        drop(scheduler);
        assert_eq!(events.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (scheduler, mut events) = TimerScheduler::new();
        let poll_id = PollId::new();
        scheduler.schedule(poll_id, Instant::now() + Duration::from_secs(60));
        assert!(scheduler.cancel(poll_id));
        assert!(!scheduler.cancel(poll_id));

        tokio::time::sleep(Duration::from_secs(120)).await;
        drop(scheduler);
        assert_eq!(events.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_noop() {
        let (scheduler, mut events) = TimerScheduler::new();
        let poll_id = PollId::new();
        scheduler.schedule(poll_id, Instant::now() + Duration::from_millis(10));
        assert_eq!(events.next().await, Some(poll_id));
        assert!(!scheduler.cancel(poll_id));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_timers_fire_in_deadline_order() {
        let (scheduler, mut events) = TimerScheduler::new();
        let late = PollId::new();
        let early = PollId::new();
        let now = Instant::now();
        scheduler.schedule(late, now + Duration::from_secs(30));
        scheduler.schedule(early, now + Duration::from_secs(10));
        assert_eq!(scheduler.pending_count(), 2);

        assert_eq!(events.next().await, Some(early));
        assert_eq!(events.next().await, Some(late));
        assert_eq!(scheduler.pending_count(), 0);
    }
}
