//! Media engine port.
//!
//! The negotiator drives one `PeerLink` per remote peer. A WebRTC binding (or the
//! synthetic link used by the CLI and the tests) implements these traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PeerLinkError;

/// Signaling state of a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// Connection-level status reported by the media engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description as relayed in the `sdp` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.kind,
            "sdp": self.sdp,
        })
    }
}

/// One peer connection
///
/// `set_remote_description` with an offer while in `HaveLocalOffer` must roll
/// back the local offer first (implicit rollback).
#[async_trait]
pub trait PeerLink: Send + Sync {
    fn signaling_state(&self) -> SignalingState;

    async fn create_offer(&self) -> Result<SessionDescription, PeerLinkError>;

    async fn create_answer(&self) -> Result<SessionDescription, PeerLinkError>;

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerLinkError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerLinkError>;

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), PeerLinkError>;

    /// Close the connection and stop any attached media
    async fn close(&self);
}

/// Creates a `PeerLink` for a remote peer
#[async_trait]
pub trait PeerLinkFactory: Send + Sync {
    async fn create(&self, peer_id: &str) -> Result<Arc<dyn PeerLink>, PeerLinkError>;
}
