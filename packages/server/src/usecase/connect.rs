//! UseCase: ソケット接続
//!
//! 接続 ID を採番して MessagePusher に登録し、`hello` を送ります。
//! ルームへの参加は `join` メッセージで別途行います。

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;

use crate::domain::{ConnectionId, ConnectionIdFactory, MessagePusher, PusherChannel};

use super::notifier::Notifier;

const HELLO_PAYLOAD: &str = "Welcome to Gameface signaling";

pub struct ConnectUseCase {
    id_factory: ConnectionIdFactory,
    message_pusher: Arc<dyn MessagePusher>,
    notifier: Notifier,
}

impl ConnectUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            id_factory: ConnectionIdFactory::new(),
            notifier: Notifier::new(message_pusher.clone()),
            message_pusher,
        }
    }

    /// 接続を登録し、採番した接続 ID を返す
    pub async fn execute(&self, sender: PusherChannel) -> ConnectionId {
        let connection_id = self.id_factory.generate();
        self.message_pusher
            .register_client(connection_id, sender)
            .await;

        self.notifier
            .send(
                connection_id,
                &ServerMessage::Hello {
                    payload: HELLO_PAYLOAD.to_string(),
                },
            )
            .await;

        connection_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::message_pusher::WebSocketMessagePusher;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_connect_assigns_sequential_ids_and_sends_hello() {
        // テスト項目: 接続ごとに 1 から順に ID が振られ、最初に hello が届く
        // given (前提条件):
        let usecase = ConnectUseCase::new(Arc::new(WebSocketMessagePusher::new()));
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        // when (操作):
        let first = usecase.execute(tx1).await;
        let second = usecase.execute(tx2).await;

        // then (期待する結果):
        assert_eq!(first, ConnectionId::new(1));
        assert_eq!(second, ConnectionId::new(2));
        let hello: ServerMessage = serde_json::from_str(&rx1.recv().await.unwrap()).unwrap();
        assert_eq!(
            hello,
            ServerMessage::Hello {
                payload: HELLO_PAYLOAD.to_string()
            }
        );
    }
}
