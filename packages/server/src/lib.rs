//! Gameface signaling server library.
//!
//! Rooms, WebRTC signaling relay and an authoritative card table state machine,
//! kept eventually consistent across server instances through a pub/sub store.

pub mod config;

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
