//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::domain::{BroadcastHub, RoomRegistry};
use crate::persistence::RoomJournal;
use crate::service::{PollService, PurgeCoordinator, RoomService, TimerScheduler};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Room and participant lifecycle.
    pub room_service: Arc<RoomService>,
    /// Poll engine.
    pub poll_service: Arc<PollService>,
    /// Room deletion.
    pub purge: Arc<PurgeCoordinator>,
    /// Broadcast hub for WebSocket subscriptions.
    pub hub: BroadcastHub,
}

impl AppState {
    /// Wires the engine around one registry, hub and timer scheduler, and
    /// spawns the timer driver.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(settings: EngineSettings, journal: RoomJournal) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let hub = BroadcastHub::with_journal(settings.broadcast_capacity, journal);
        let (scheduler, timer_events) = TimerScheduler::new();

        let room_service = RoomService::new(Arc::clone(&registry), hub.clone());
        let poll_service = PollService::new(
            Arc::clone(&registry),
            hub.clone(),
            scheduler.clone(),
            settings.max_timer_minutes,
        );
        let purge = PurgeCoordinator::new(registry, hub.clone(), scheduler);

        // Detached; lives as long as the runtime.
        let _driver = poll_service.spawn_timer_driver(timer_events);

        Self {
            room_service: Arc::new(room_service),
            poll_service: Arc::new(poll_service),
            purge: Arc::new(purge),
            hub,
        }
    }

    /// Engine with default settings and no journal.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(EngineSettings::default(), RoomJournal::disabled())
    }
}
