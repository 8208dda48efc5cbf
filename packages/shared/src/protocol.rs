//! JSON wire protocol of the signaling socket.
//!
//! Every frame is a single UTF-8 JSON object with a `type` field.
//! `ClientMessage` covers client → server frames and `ServerMessage`
//! covers server → client frames.
//!
//! SDP and ICE candidate payloads are kept as raw JSON values: the server
//! relays them verbatim and only the client interprets them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Lifecycle of a card table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatusDto {
    #[default]
    Lobby,
    Started,
    Finished,
}

/// One seat of a card table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatDto {
    pub index: usize,
    pub player_id: Option<String>,
}

/// Authoritative card table state as exchanged on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStateDto {
    pub game_id: Option<String>,
    pub seats: Vec<SeatDto>,
    pub status: TableStatusDto,
    pub host_id: Option<String>,
}

/// Client → server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join")]
    Join { room: String },

    #[serde(rename = "leave")]
    Leave,

    #[serde(rename = "select-game")]
    SelectGame {
        game: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        players: Option<usize>,
    },

    #[serde(rename = "select-activity")]
    SelectActivity { activity: String },

    #[serde(rename = "cardtable.seat.claim", rename_all = "camelCase")]
    SeatClaim {
        seat_index: usize,
        player_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<String>,
    },

    #[serde(rename = "cardtable.seat.release", rename_all = "camelCase")]
    SeatRelease {
        seat_index: usize,
        player_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<String>,
    },

    /// Whole-table overwrite, no conflict protection
    #[serde(rename = "cardtable.seat.update", rename_all = "camelCase")]
    SeatUpdate { table_state: Value },

    #[serde(rename = "cardtable.start", rename_all = "camelCase")]
    TableStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_state: Option<Value>,
    },

    #[serde(rename = "cardtable.finish")]
    TableFinish,

    #[serde(rename = "offer")]
    Offer {
        sdp: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    #[serde(rename = "answer")]
    Answer {
        sdp: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    #[serde(rename = "candidate")]
    Candidate {
        candidate: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    #[serde(rename = "ready")]
    Ready,

    #[serde(rename = "start-game")]
    StartGame,
}

impl ClientMessage {
    /// Every `type` value the server knows how to route
    pub const KNOWN_TYPES: [&'static str; 14] = [
        "join",
        "leave",
        "select-game",
        "select-activity",
        "cardtable.seat.claim",
        "cardtable.seat.release",
        "cardtable.seat.update",
        "cardtable.start",
        "cardtable.finish",
        "offer",
        "answer",
        "candidate",
        "ready",
        "start-game",
    ];

    /// The `type` tag of this message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::SelectGame { .. } => "select-game",
            Self::SelectActivity { .. } => "select-activity",
            Self::SeatClaim { .. } => "cardtable.seat.claim",
            Self::SeatRelease { .. } => "cardtable.seat.release",
            Self::SeatUpdate { .. } => "cardtable.seat.update",
            Self::TableStart { .. } => "cardtable.start",
            Self::TableFinish => "cardtable.finish",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Ready => "ready",
            Self::StartGame => "start-game",
        }
    }
}

/// Server → client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "hello")]
    Hello { payload: String },

    #[serde(rename = "welcome")]
    Welcome { id: String },

    #[serde(rename = "peer-joined")]
    PeerJoined { id: String },

    #[serde(rename = "peer-left")]
    PeerLeft { id: String },

    #[serde(rename = "game-selected")]
    GameSelected { game: String },

    #[serde(rename = "activity-selected")]
    ActivitySelected { activity: String },

    #[serde(rename = "ready")]
    Ready { id: String },

    #[serde(rename = "all-ready")]
    AllReady,

    #[serde(rename = "start-game")]
    StartGame { game: String },

    #[serde(rename = "cardtable.seat.update", rename_all = "camelCase")]
    SeatUpdate { table_state: TableStateDto },

    #[serde(rename = "cardtable.start", rename_all = "camelCase")]
    TableStart {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        table_state: TableStateDto,
    },

    #[serde(rename = "offer")]
    Offer { sdp: Value, id: String },

    #[serde(rename = "answer")]
    Answer { sdp: Value, id: String },

    #[serde(rename = "candidate")]
    Candidate { candidate: Value, id: String },
}

impl ServerMessage {
    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Result of decoding one inbound client frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A frame with a known `type` and valid fields
    Message(ClientMessage),
    /// Valid JSON whose `type` is missing or not routed by the server
    Unrecognized,
}

/// Wire protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not JSON
    #[error("Malformed JSON frame: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// The frame has a known `type` but its fields are missing or invalid
    #[error("Invalid '{kind}' message: {source}")]
    InvalidMessage {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// A message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode one inbound client text frame.
///
/// Malformed JSON and known-but-invalid messages are errors (the caller drops
/// them); anything else that is valid JSON without a routed `type` is
/// `InboundFrame::Unrecognized`.
pub fn decode_client_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::MalformedJson)?;

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) if is_routed_type(kind) => kind.to_string(),
        _ => return Ok(InboundFrame::Unrecognized),
    };

    serde_json::from_value::<ClientMessage>(value)
        .map(InboundFrame::Message)
        .map_err(|source| ProtocolError::InvalidMessage { kind, source })
}

fn is_routed_type(kind: &str) -> bool {
    ClientMessage::KNOWN_TYPES.contains(&kind)
}
