//! Synthetic peer links.
//!
//! Follows the offer/answer state machine of a real peer connection but carries
//! no media. The CLI uses it to take part in negotiation without a media engine,
//! and tests use it to inspect what the negotiator did.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PeerLinkError;

use super::peer::{PeerLink, PeerLinkFactory, SdpKind, SessionDescription, SignalingState};

#[derive(Debug)]
struct LinkState {
    signaling_state: SignalingState,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    candidates: Vec<Value>,
    rollbacks: usize,
    closed: bool,
}

/// A media-less `PeerLink`
#[derive(Debug)]
pub struct SyntheticPeerLink {
    owner: String,
    peer_id: String,
    state: Mutex<LinkState>,
}

impl SyntheticPeerLink {
    pub fn new(owner: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            peer_id: peer_id.into(),
            state: Mutex::new(LinkState {
                signaling_state: SignalingState::Stable,
                local: None,
                remote: None,
                candidates: Vec::new(),
                rollbacks: 0,
                closed: false,
            }),
        }
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.lock().local.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.lock().remote.clone()
    }

    pub fn candidates(&self) -> Vec<Value> {
        self.lock().candidates.clone()
    }

    /// How many local offers were rolled back by an incoming offer
    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn description(&self, kind: SdpKind) -> SessionDescription {
        let label = match kind {
            SdpKind::Offer => "offer",
            SdpKind::Answer => "answer",
        };
        SessionDescription {
            kind,
            sdp: format!("{} {}->{}", label, self.owner, self.peer_id),
        }
    }
}

#[async_trait]
impl PeerLink for SyntheticPeerLink {
    fn signaling_state(&self) -> SignalingState {
        self.lock().signaling_state
    }

    async fn create_offer(&self) -> Result<SessionDescription, PeerLinkError> {
        if self.is_closed() {
            return Err(PeerLinkError("link is closed".to_string()));
        }
        Ok(self.description(SdpKind::Offer))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerLinkError> {
        if self.signaling_state() != SignalingState::HaveRemoteOffer {
            return Err(PeerLinkError("no remote offer to answer".to_string()));
        }
        Ok(self.description(SdpKind::Answer))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerLinkError> {
        let mut state = self.lock();
        state.signaling_state = match (state.signaling_state, description.kind) {
            (SignalingState::Stable, SdpKind::Offer) => SignalingState::HaveLocalOffer,
            (SignalingState::HaveRemoteOffer, SdpKind::Answer) => SignalingState::Stable,
            (current, kind) => {
                return Err(PeerLinkError(format!(
                    "cannot set local {:?} in {:?}",
                    kind, current
                )));
            }
        };
        state.local = Some(description);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerLinkError> {
        let mut state = self.lock();
        state.signaling_state = match (state.signaling_state, description.kind) {
            (SignalingState::Stable, SdpKind::Offer) => SignalingState::HaveRemoteOffer,
            (SignalingState::HaveLocalOffer, SdpKind::Offer) => {
                state.rollbacks += 1;
                state.local = None;
                SignalingState::HaveRemoteOffer
            }
            (SignalingState::HaveLocalOffer, SdpKind::Answer) => SignalingState::Stable,
            (current, kind) => {
                return Err(PeerLinkError(format!(
                    "cannot set remote {:?} in {:?}",
                    kind, current
                )));
            }
        };
        state.remote = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), PeerLinkError> {
        self.lock().candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.signaling_state = SignalingState::Closed;
    }
}

/// Factory that keeps every link it created for inspection
#[derive(Debug, Default)]
pub struct SyntheticPeerLinkFactory {
    owner: String,
    links: Mutex<HashMap<String, Arc<SyntheticPeerLink>>>,
}

impl SyntheticPeerLinkFactory {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            links: Mutex::new(HashMap::new()),
        }
    }

    /// The most recent link created for the peer
    pub fn link(&self, peer_id: &str) -> Option<Arc<SyntheticPeerLink>> {
        self.lock().get(peer_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<SyntheticPeerLink>>> {
        self.links
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PeerLinkFactory for SyntheticPeerLinkFactory {
    async fn create(&self, peer_id: &str) -> Result<Arc<dyn PeerLink>, PeerLinkError> {
        let link = Arc::new(SyntheticPeerLink::new(self.owner.clone(), peer_id));
        self.lock().insert(peer_id.to_string(), link.clone());
        Ok(link)
    }
}
