//! # secret-poll
//!
//! Real-time engine for anonymous meeting polls.
//!
//! An organizer opens a room, participants join and wait for approval, and
//! approved participants cast one secret vote per poll. Only aggregate
//! tallies are ever stored or exposed: the vote ledger remembers *who*
//! voted, never *what* they chose. Every accepted mutation is pushed live to
//! the room's WebSocket subscribers, and a purge removes every trace of a
//! room.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── RoomService / PollService / PurgeCoordinator (service/)
//!     ├── TimerScheduler (service/)
//!     │
//!     ├── RoomRegistry, VoteLedger (domain/)
//!     ├── BroadcastHub (domain/)
//!     │
//!     └── optional PostgreSQL room journal (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
