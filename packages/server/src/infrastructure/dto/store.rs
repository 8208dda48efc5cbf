//! 外部ストアに流れる DTO
//!
//! ## チャンネル・キー
//!
//! ```text
//! signaling:room:{room}          ルームごとの pub/sub チャンネル
//! signaling:room:*               全ルームをまとめて購読するパターン
//! signaling:room:{room}:state    ルームのスナップショット（TTL 付き）
//! ```

use gameface_shared::protocol::TableStateDto;
use serde::{Deserialize, Serialize};

const ROOM_CHANNEL_PREFIX: &str = "signaling:room:";

/// 全ルームのチャンネルに一致する購読パターン
pub const ROOM_CHANNEL_PATTERN: &str = "signaling:room:*";

pub fn room_channel(room: &str) -> String {
    format!("{}{}", ROOM_CHANNEL_PREFIX, room)
}

pub fn room_state_key(room: &str) -> String {
    format!("{}{}:state", ROOM_CHANNEL_PREFIX, room)
}

/// プロセス間で publish されるイベント
///
/// `source` は publish したプロセスのインスタンス ID。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub source: String,
    pub room: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "game-selected", rename_all = "camelCase")]
    GameSelected {
        game: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_state: Option<TableStateDto>,
    },

    #[serde(rename = "activity-selected")]
    ActivitySelected { activity: String },

    #[serde(rename = "cardtable.seat.update", rename_all = "camelCase")]
    SeatUpdate { table_state: TableStateDto },

    #[serde(rename = "cardtable.start", rename_all = "camelCase")]
    TableStart { table_state: TableStateDto },
}

/// 永続化されるルームのスナップショット
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshotDto {
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub table_state: Option<TableStateDto>,
}
