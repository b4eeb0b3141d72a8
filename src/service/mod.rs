//! Service layer: the room/poll engine.
//!
//! [`RoomService`] owns room and participant lifecycle, [`PollService`] is
//! the poll engine, [`TimerScheduler`] arms auto-stop deadlines, and
//! [`PurgeCoordinator`] deletes rooms. All of them share one
//! [`crate::domain::RoomRegistry`] and publish through one
//! [`crate::domain::BroadcastHub`].

pub mod poll_service;
pub mod purge;
pub mod room_service;
pub mod timer_scheduler;

pub use poll_service::{PollService, VoteReceipt};
pub use purge::{PurgeCoordinator, PurgeReport};
pub use room_service::{JoinedParticipant, RoomReport, RoomService};
pub use timer_scheduler::{TimerEvents, TimerScheduler};
