//! Code shared by the Gameface signaling server and client.
//!
//! - `logger`: tracing subscriber setup for the binaries
//! - `time`: clock abstraction and timestamp formatting
//! - `protocol`: JSON wire messages exchanged over the signaling socket

pub mod logger;
pub mod protocol;
pub mod time;
