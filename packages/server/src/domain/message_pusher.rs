//! MessagePusher trait 定義
//!
//! 接続中のクライアントへメッセージを届けるためのインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// クライアントへの送信チャンネル（シリアライズ済みの JSON テキスト）
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// クライアントを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// クライアントの登録を解除
    async fn unregister_client(&self, connection_id: ConnectionId);

    /// 特定のクライアントに送信
    async fn push_to(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数のクライアントに送信
    ///
    /// ベストエフォート。一部の送信に失敗しても残りのクライアントへの送信は続ける。
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        content: &str,
    ) -> Result<(), MessagePushError>;
}
