//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers serialize as strings (room ids) or UUIDs (participants,
//! polls). Tallies serialize as a JSON object in option order.

pub mod poll_dto;
pub mod room_dto;

pub use poll_dto::*;
pub use room_dto::*;
