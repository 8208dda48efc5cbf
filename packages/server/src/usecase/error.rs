//! UseCase 層のエラー定義
//!
//! どのエラーも接続を閉じたりプロセスを終了させたりはしない。
//! Signaling Router がログに残し、そのメッセージを破棄する。

use thiserror::Error;

use crate::domain::{ConnectionId, RepositoryError, RoomId, ValueObjectError};

/// ルーム参加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Invalid room: {0}")]
    InvalidRoom(#[from] ValueObjectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// ルーム内の操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomActionError {
    #[error("Connection '{0}' has not joined a room")]
    NotInRoom(ConnectionId),

    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("'players' must be at most {max} (got {requested})")]
    TooManySeats { requested: usize, max: usize },

    #[error("No game selected in room '{0}'")]
    NoGameSelected(RoomId),

    #[error("No card table in room '{0}'")]
    NoTable(RoomId),

    #[error(transparent)]
    InvalidValue(#[from] ValueObjectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
