//! サーバー → クライアントのメッセージ送信ヘルパー
//!
//! `ServerMessage` を 1 回だけシリアライズして MessagePusher に渡します。
//! 送信の失敗はログに残すだけで、呼び出し側には返しません。

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;

use crate::domain::{ConnectionId, MessagePusher};

#[derive(Clone)]
pub struct Notifier {
    message_pusher: Arc<dyn MessagePusher>,
}

impl Notifier {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 1 つの接続に送信
    pub async fn send(&self, to: ConnectionId, message: &ServerMessage) {
        let Some(text) = encode(message) else {
            return;
        };
        self.send_raw(to, &text).await;
    }

    /// シリアライズ済みのテキストをそのまま送信
    pub async fn send_raw(&self, to: ConnectionId, text: &str) {
        if let Err(e) = self.message_pusher.push_to(to, text).await {
            tracing::warn!("Failed to send message to '{}': {}", to, e);
        }
    }

    /// 複数の接続に送信
    pub async fn broadcast(&self, targets: &[ConnectionId], message: &ServerMessage) {
        if targets.is_empty() {
            return;
        }
        let Some(text) = encode(message) else {
            return;
        };
        if let Err(e) = self.message_pusher.broadcast(targets, &text).await {
            tracing::warn!("Failed to broadcast message: {}", e);
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match message.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}
