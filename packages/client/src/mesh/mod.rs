//! Full-mesh WebRTC negotiation.

pub mod negotiator;
pub mod peer;
pub mod synthetic;

pub use negotiator::PeerMeshNegotiator;
pub use peer::{
    ConnectionStatus, PeerLink, PeerLinkFactory, SdpKind, SessionDescription, SignalingState,
};
pub use synthetic::{SyntheticPeerLink, SyntheticPeerLinkFactory};
