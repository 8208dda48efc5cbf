//! Error types for the signaling client.

use gameface_shared::protocol::ProtocolError;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not connect or the connection was lost
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The connection is already closed, nothing can be sent
    #[error("Connection is closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Failure reported by the media engine behind a `PeerLink`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PeerLinkError(pub String);

/// Errors of the peer mesh negotiation
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The media engine rejected an operation for this peer
    #[error("Peer '{peer}': {source}")]
    Link {
        peer: String,
        #[source]
        source: PeerLinkError,
    },

    /// The relayed `sdp` is not a session description
    #[error("Peer '{peer}' sent an invalid session description: {source}")]
    InvalidDescription {
        peer: String,
        #[source]
        source: serde_json::Error,
    },

    /// The signaling channel is gone
    #[error("Signaling channel is closed")]
    ChannelClosed,
}
