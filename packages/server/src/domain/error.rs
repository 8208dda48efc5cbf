//! ドメイン層のエラー定義

use thiserror::Error;

/// 値オブジェクトの生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Room id must not be empty")]
    EmptyRoomId,

    #[error("Player id must not be empty")]
    EmptyPlayerId,

    #[error("Invalid connection id: '{0}'")]
    InvalidConnectionId(String),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Connection '{0}' is already a member of room '{1}'")]
    AlreadyInRoom(String, String),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}

/// 外部ストア（pub/sub, key/value）のエラー
///
/// どのバリアントもプロセスを終了させない。呼び出し側はログを出して
/// 単一プロセスの動作に縮退する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Failed to connect to store: {0}")]
    Connect(String),

    #[error("Failed to publish to '{channel}': {reason}")]
    Publish { channel: String, reason: String },

    #[error("Failed to subscribe to '{pattern}': {reason}")]
    Subscribe { pattern: String, reason: String },

    #[error("Store command on '{key}' failed: {reason}")]
    Store { key: String, reason: String },

    #[error("Failed to decode payload: {0}")]
    Decode(String),
}
