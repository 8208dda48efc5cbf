//! Peer Mesh Negotiator
//!
//! Keeps one `PeerLink` per remote peer of the room (full mesh) and runs the
//! offer/answer/candidate exchange with every one of them.
//!
//! ## Glare resolution
//!
//! Both sides may send an offer at the same time. Each side compares its own
//! connection id with the remote one: the side with the larger id is *polite*.
//! An incoming offer that collides with our own negotiation (we are producing an
//! offer, or the link is not `stable`) is dropped by the impolite side and
//! accepted by the polite side, which rolls back its own offer.
//!
//! ## Ordering
//!
//! - offers that arrive before our own id is known (`welcome`) are buffered and
//!   replayed once it is
//! - a candidate for an unknown peer creates the link on demand
//! - `peer-left` closes the link and forgets the peer
//!
//! Every outgoing offer/answer/candidate carries `target`, so the server delivers
//! it to that peer only.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use gameface_shared::protocol::{ClientMessage, ServerMessage};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{NegotiationError, PeerLinkError};

use super::peer::{ConnectionStatus, PeerLink, PeerLinkFactory, SessionDescription, SignalingState};

struct PeerEntry {
    link: Arc<dyn PeerLink>,
    making_offer: bool,
    ignore_offer: bool,
    status: ConnectionStatus,
}

pub struct PeerMeshNegotiator {
    factory: Arc<dyn PeerLinkFactory>,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    self_id: Option<String>,
    peers: BTreeMap<String, PeerEntry>,
    pending_offers: Vec<(String, Value)>,
}

impl PeerMeshNegotiator {
    pub fn new(
        factory: Arc<dyn PeerLinkFactory>,
        outgoing: mpsc::UnboundedSender<ClientMessage>,
    ) -> Self {
        Self {
            factory,
            outgoing,
            self_id: None,
            peers: BTreeMap::new(),
            pending_offers: Vec::new(),
        }
    }

    /// Our own connection id, once `welcome` arrived
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Ids of the peers we currently hold a link for
    pub fn peers(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    pub fn connection_status(&self, peer_id: &str) -> Option<ConnectionStatus> {
        self.peers.get(peer_id).map(|entry| entry.status)
    }

    /// Record a connection-level status reported by the media engine
    pub fn set_connection_status(&mut self, peer_id: &str, status: ConnectionStatus) {
        if let Some(entry) = self.peers.get_mut(peer_id) {
            tracing::debug!("Peer '{}' is {:?}", peer_id, status);
            entry.status = status;
        }
    }

    /// Whether we are the polite side towards the peer (`None` before `welcome`)
    pub fn is_polite(&self, peer_id: &str) -> Option<bool> {
        self.self_id
            .as_deref()
            .map(|self_id| compare_ids(self_id, peer_id) == Ordering::Greater)
    }

    /// Handle one server message; messages unrelated to negotiation are ignored
    pub async fn handle(&mut self, message: &ServerMessage) -> Result<(), NegotiationError> {
        match message {
            ServerMessage::Welcome { id } => self.on_welcome(id).await,
            ServerMessage::PeerJoined { id } => self.on_peer_joined(id).await,
            ServerMessage::PeerLeft { id } => {
                self.teardown(id).await;
                Ok(())
            }
            ServerMessage::Offer { sdp, id } => {
                if self.self_id.is_none() {
                    tracing::debug!("Buffering offer from '{}' until our id is known", id);
                    self.pending_offers.push((id.clone(), sdp.clone()));
                    return Ok(());
                }
                self.on_offer(id, sdp).await
            }
            ServerMessage::Answer { sdp, id } => self.on_answer(id, sdp).await,
            ServerMessage::Candidate { candidate, id } => self.on_candidate(id, candidate).await,
            _ => Ok(()),
        }
    }

    /// Send a candidate gathered locally for the peer
    pub fn send_local_candidate(
        &self,
        peer_id: &str,
        candidate: Value,
    ) -> Result<(), NegotiationError> {
        self.send(ClientMessage::Candidate {
            candidate,
            target: Some(peer_id.to_string()),
        })
    }

    /// Close every link (leaving the room)
    pub async fn close_all(&mut self) {
        let peers = std::mem::take(&mut self.peers);
        for (peer_id, entry) in peers {
            entry.link.close().await;
            tracing::debug!("Closed link to '{}'", peer_id);
        }
        self.pending_offers.clear();
    }

    async fn on_welcome(&mut self, id: &str) -> Result<(), NegotiationError> {
        tracing::info!("Our connection id is '{}'", id);
        self.self_id = Some(id.to_string());

        let pending = std::mem::take(&mut self.pending_offers);
        let mut first_error = None;
        for (from, sdp) in pending {
            if let Err(e) = self.on_offer(&from, &sdp).await {
                tracing::warn!("Replayed offer failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// A newcomer joined: we initiate
    async fn on_peer_joined(&mut self, id: &str) -> Result<(), NegotiationError> {
        if self.self_id.as_deref() == Some(id) {
            return Ok(());
        }
        self.ensure_link(id).await?;
        self.make_offer(id).await
    }

    async fn make_offer(&mut self, peer_id: &str) -> Result<(), NegotiationError> {
        let link = self.ensure_link(peer_id).await?;
        self.set_making_offer(peer_id, true);

        let result = async {
            let offer = link.create_offer().await?;
            link.set_local_description(offer.clone()).await?;
            Ok::<_, PeerLinkError>(offer)
        }
        .await;

        self.set_making_offer(peer_id, false);
        let offer = result.map_err(|source| link_error(peer_id, source))?;
        tracing::debug!("Sending offer to '{}'", peer_id);
        self.send(ClientMessage::Offer {
            sdp: offer.to_value(),
            target: Some(peer_id.to_string()),
        })
    }

    async fn on_offer(&mut self, from: &str, sdp: &Value) -> Result<(), NegotiationError> {
        let description = parse_description(from, sdp)?;
        let polite = self.is_polite(from).unwrap_or(false);
        let link = self.ensure_link(from).await?;

        let making_offer = self
            .peers
            .get(from)
            .map(|entry| entry.making_offer)
            .unwrap_or(false);
        let collision = making_offer || link.signaling_state() != SignalingState::Stable;
        let ignore_offer = !polite && collision;
        if let Some(entry) = self.peers.get_mut(from) {
            entry.ignore_offer = ignore_offer;
        }
        if ignore_offer {
            tracing::debug!("Ignoring colliding offer from '{}' (we are impolite)", from);
            return Ok(());
        }
        if collision {
            tracing::debug!("Accepting colliding offer from '{}' (we are polite)", from);
        }

        let answer = async {
            link.set_remote_description(description).await?;
            let answer = link.create_answer().await?;
            link.set_local_description(answer.clone()).await?;
            Ok::<_, PeerLinkError>(answer)
        }
        .await
        .map_err(|source| link_error(from, source))?;

        tracing::debug!("Sending answer to '{}'", from);
        self.send(ClientMessage::Answer {
            sdp: answer.to_value(),
            target: Some(from.to_string()),
        })
    }

    async fn on_answer(&mut self, from: &str, sdp: &Value) -> Result<(), NegotiationError> {
        let Some(entry) = self.peers.get(from) else {
            tracing::debug!("Answer from unknown peer '{}' ignored", from);
            return Ok(());
        };
        let description = parse_description(from, sdp)?;
        entry
            .link
            .set_remote_description(description)
            .await
            .map_err(|source| link_error(from, source))
    }

    async fn on_candidate(&mut self, from: &str, candidate: &Value) -> Result<(), NegotiationError> {
        let link = self.ensure_link(from).await?;
        match link.add_ice_candidate(candidate.clone()).await {
            Ok(()) => Ok(()),
            // candidates of an offer we dropped are expected to fail
            Err(e) if self.peers.get(from).is_some_and(|entry| entry.ignore_offer) => {
                tracing::debug!("Candidate from '{}' ignored: {}", from, e);
                Ok(())
            }
            Err(source) => Err(link_error(from, source)),
        }
    }

    async fn ensure_link(&mut self, peer_id: &str) -> Result<Arc<dyn PeerLink>, NegotiationError> {
        if let Some(entry) = self.peers.get(peer_id) {
            return Ok(entry.link.clone());
        }
        let link = self
            .factory
            .create(peer_id)
            .await
            .map_err(|source| link_error(peer_id, source))?;
        tracing::debug!("Created link to '{}'", peer_id);
        self.peers.insert(
            peer_id.to_string(),
            PeerEntry {
                link: link.clone(),
                making_offer: false,
                ignore_offer: false,
                status: ConnectionStatus::New,
            },
        );
        Ok(link)
    }

    async fn teardown(&mut self, peer_id: &str) {
        self.pending_offers.retain(|(from, _)| from != peer_id);
        if let Some(entry) = self.peers.remove(peer_id) {
            entry.link.close().await;
            tracing::info!("Peer '{}' left, link closed", peer_id);
        }
    }

    fn set_making_offer(&mut self, peer_id: &str, making_offer: bool) {
        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.making_offer = making_offer;
        }
    }

    fn send(&self, message: ClientMessage) -> Result<(), NegotiationError> {
        self.outgoing
            .send(message)
            .map_err(|_| NegotiationError::ChannelClosed)
    }
}

/// Numeric comparison of connection ids, falling back to string order
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn parse_description(peer: &str, sdp: &Value) -> Result<SessionDescription, NegotiationError> {
    serde_json::from_value(sdp.clone()).map_err(|source| NegotiationError::InvalidDescription {
        peer: peer.to_string(),
        source,
    })
}

fn link_error(peer: &str, source: PeerLinkError) -> NegotiationError {
    NegotiationError::Link {
        peer: peer.to_string(),
        source,
    }
}
