//! Gameface signaling client library.
//!
//! - `signaling`: typed WebSocket client with subscription handles
//! - `mesh`: full-mesh WebRTC negotiation with glare resolution
//! - `runner` / `session`: the reconnecting CLI client

pub mod domain;
pub mod error;
pub mod formatter;
pub mod mesh;
pub mod runner;
pub mod session;
pub mod signaling;

pub use error::{ClientError, NegotiationError, PeerLinkError};
pub use runner::run_client;
pub use signaling::{SignalingClient, Subscription};
