//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - クライアントへのメッセージ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の受付は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は受付時に生成された `UnboundedSender` を受け取り、送信にだけ使います。
//! sender の受信側（ソケットへの書き込みタスク）が終了している接続は
//! OPEN ではないとみなして送信対象から外します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
#[derive(Debug, Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの WebSocket sender
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_client(&self, connection_id: ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(&connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(&connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;

        tracing::debug!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            let Some(sender) = clients.get(target) else {
                tracing::warn!(
                    "Connection '{}' not found during broadcast, skipping",
                    target
                );
                continue;
            };
            if sender.is_closed() {
                tracing::debug!("Connection '{}' is closing, skipping", target);
                continue;
            }
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = sender.send(content.to_string()) {
                tracing::warn!("Failed to push message to connection '{}': {}", target, e);
            }
        }

        Ok(())
    }
}
