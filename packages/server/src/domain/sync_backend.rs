//! SyncBackend trait 定義
//!
//! プロセス間で共有される pub/sub と TTL 付き key/value ストアへのポート。
//! 本番では Redis、単一プロセス構成やテストではインメモリの実装を注入します。

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::SyncError;

/// pub/sub で受信した 1 件のメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// ストアへ接続する
    ///
    /// 冪等。接続中に並行して呼ばれた場合は同じ接続処理の完了を待つ。
    /// 失敗した場合は接続済みとはみなさず、次の呼び出しで再試行する。
    async fn connect(&self) -> Result<(), SyncError>;

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), SyncError>;

    /// パターン（`*` のみ対応）に一致するチャンネルを購読する
    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> Result<mpsc::UnboundedReceiver<ChannelMessage>, SyncError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
    -> Result<(), SyncError>;

    async fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    async fn del(&self, key: &str) -> Result<(), SyncError>;
}
