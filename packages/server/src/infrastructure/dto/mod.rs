//! Data Transfer Objects (DTOs) for the signaling server.
//!
//! The client-facing wire types live in `gameface_shared::protocol`. This module
//! holds what only the server exchanges:
//! - `store`: payloads published on the pub/sub channels and persisted snapshots
//! - `conversion`: conversion between domain entities and DTOs

pub mod conversion;
pub mod store;
