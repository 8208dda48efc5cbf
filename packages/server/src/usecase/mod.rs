//! UseCase 層
//!
//! クライアントの操作ごとに 1 つの UseCase を持ちます。
//! UseCase は Domain 層のポート（Repository, MessagePusher）と
//! `CrossInstanceSync` だけに依存し、WebSocket やストアの具体的な実装は知りません。

pub mod card_table;
pub mod connect;
pub mod disconnect;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod notifier;
pub mod readiness;
pub mod relay_signal;
pub mod select_activity;
pub mod select_game;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use card_table::CardTableUseCase;
pub use connect::ConnectUseCase;
pub use disconnect::DisconnectUseCase;
pub use error::{JoinError, RoomActionError};
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use notifier::Notifier;
pub use readiness::ReadinessUseCase;
pub use relay_signal::{RelaySignalUseCase, Signal};
pub use select_activity::SelectActivityUseCase;
pub use select_game::SelectGameUseCase;
pub use sync::{CrossInstanceSync, DEFAULT_SNAPSHOT_TTL};
