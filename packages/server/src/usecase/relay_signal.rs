//! UseCase: WebRTC シグナリングの中継
//!
//! offer / answer / candidate の中身は解釈せず、送信者の ID を付けて転送します。
//! `target` が同じルームの他のメンバーを指していればその 1 人だけに、
//! それ以外（未指定・不明・不正）の場合は送信者以外の全員に送ります。

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;
use serde_json::Value;

use crate::domain::{ConnectionId, MessagePusher, RoomRepository};

use super::{error::RoomActionError, notifier::Notifier};

/// 中継するシグナリングメッセージ
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Offer(Value),
    Answer(Value),
    Candidate(Value),
}

impl Signal {
    fn into_message(self, from: ConnectionId) -> ServerMessage {
        let id = from.to_string();
        match self {
            Signal::Offer(sdp) => ServerMessage::Offer { sdp, id },
            Signal::Answer(sdp) => ServerMessage::Answer { sdp, id },
            Signal::Candidate(candidate) => ServerMessage::Candidate { candidate, id },
        }
    }
}

pub struct RelaySignalUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
}

impl RelaySignalUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            notifier: Notifier::new(message_pusher),
        }
    }

    pub async fn execute(
        &self,
        from: ConnectionId,
        signal: Signal,
        target: Option<String>,
    ) -> Result<(), RoomActionError> {
        let room_id = self
            .repository
            .room_of(from)
            .await
            .ok_or(RoomActionError::NotInRoom(from))?;

        let others: Vec<ConnectionId> = self
            .repository
            .members(&room_id)
            .await
            .into_iter()
            .filter(|member| *member != from)
            .collect();

        let targeted = target
            .as_deref()
            .and_then(|target| target.parse::<ConnectionId>().ok())
            .filter(|target| others.contains(target));
        let recipients = match targeted {
            Some(target) => vec![target],
            None => others,
        };

        self.notifier
            .broadcast(&recipients, &signal.into_message(from))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestContext, drain};
    use serde_json::json;

    #[tokio::test]
    async fn test_targeted_offer_reaches_only_target() {
        // テスト項目: target を指定した offer は指定したメンバーだけに届く
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;
        let (bob, mut bob_rx) = ctx.connect(2).await;
        let (carol, mut carol_rx) = ctx.connect(3).await;
        for conn in [alice, bob, carol] {
            ctx.join_room.execute(conn, "r1".to_string()).await.unwrap();
        }
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        drain(&mut carol_rx);

        // when (操作):
        ctx.relay
            .execute(
                alice,
                Signal::Offer(json!({"type": "offer", "sdp": "v=0"})),
                Some("2".to_string()),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            drain(&mut bob_rx),
            vec![ServerMessage::Offer {
                sdp: json!({"type": "offer", "sdp": "v=0"}),
                id: "1".to_string()
            }]
        );
        assert!(drain(&mut carol_rx).is_empty());
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_falls_back_to_broadcast() {
        // テスト項目: ルームにいない target の場合は送信者以外の全員に届く
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;
        let (bob, mut bob_rx) = ctx.connect(2).await;
        let (carol, mut carol_rx) = ctx.connect(3).await;
        for conn in [alice, bob, carol] {
            ctx.join_room.execute(conn, "r1".to_string()).await.unwrap();
        }
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        drain(&mut carol_rx);

        // when (操作):
        ctx.relay
            .execute(
                alice,
                Signal::Candidate(json!({"candidate": "c"})),
                Some("99".to_string()),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(drain(&mut bob_rx).len(), 1);
        assert_eq!(drain(&mut carol_rx).len(), 1);
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_relay_without_room() {
        // テスト項目: ルームに参加していない接続のシグナリングは中継されない
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, _alice_rx) = ctx.connect(1).await;

        // when (操作):
        let result = ctx
            .relay
            .execute(alice, Signal::Answer(json!({})), None)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomActionError::NotInRoom(alice)));
    }
}
