//! WebSocket signaling server implementation.

mod handler;
pub mod router;
mod server;
mod signal;
pub mod state;

pub use router::SignalingRouter;
pub use server::Server;
pub use state::AppState;
