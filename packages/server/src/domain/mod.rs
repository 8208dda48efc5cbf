//! ドメイン層
//!
//! ルーム・接続・カードテーブルのモデルと、ドメインが必要とするポート
//! （`RoomRepository`, `MessagePusher`, `SyncBackend`）を定義します。

pub mod entity;
pub mod error;
pub mod game_catalog;
pub mod message_pusher;
pub mod repository;
pub mod sync_backend;
pub mod value_object;

pub use entity::{
    MAX_SEAT_COUNT, MemberRemoved, ReadyOutcome, RemoteUpdate, Room, RoomCleanup, RoomSnapshot,
    Seat, SeatOutcome, StartVerdict, TableCommand, TableOutcome, TableState, TableStatus,
};
pub use error::{MessagePushError, RepositoryError, SyncError, ValueObjectError};
pub use game_catalog::{GameDefinition, StartValidator, find_game, seat_count_for, validator_for};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{MemberAdded, RoomRepository, TableUpdate};
pub use sync_backend::{ChannelMessage, SyncBackend};
#[cfg(test)]
pub use sync_backend::MockSyncBackend;
pub use value_object::{ConnectionId, ConnectionIdFactory, InstanceId, PlayerId, RoomId};
