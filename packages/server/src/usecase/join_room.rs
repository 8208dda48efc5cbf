//! UseCase: ルームへの参加
//!
//! 1. すでに別のルームにいれば先に退出する
//! 2. メンバーに追加し、本人に `welcome{id}`、他のメンバーに `peer-joined{id}` を送る
//! 3. このプロセスがルームの状態を持っていなければスナップショットから復元する
//! 4. 選択中のゲーム・アクティビティ・テーブルを本人に送る

use std::sync::Arc;

use gameface_shared::protocol::{ServerMessage, TableStateDto};

use crate::domain::{ConnectionId, MessagePusher, RoomId, RoomRepository};

use super::{
    error::JoinError, leave_room::LeaveRoomUseCase, notifier::Notifier, sync::CrossInstanceSync,
};

pub struct JoinRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
    sync: Arc<CrossInstanceSync>,
    leave_room: Arc<LeaveRoomUseCase>,
}

impl JoinRoomUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        sync: Arc<CrossInstanceSync>,
        leave_room: Arc<LeaveRoomUseCase>,
    ) -> Self {
        Self {
            repository,
            notifier: Notifier::new(message_pusher),
            sync,
            leave_room,
        }
    }

    pub async fn execute(&self, connection_id: ConnectionId, room: String) -> Result<(), JoinError> {
        let room_id = RoomId::new(room)?;

        if self.repository.room_of(connection_id).await.is_some() {
            self.leave_room.execute(connection_id).await;
        }

        let added = self.repository.add_member(&room_id, connection_id).await?;
        tracing::info!("Connection '{}' joined room '{}'", connection_id, room_id);

        let id = connection_id.to_string();
        self.notifier
            .send(connection_id, &ServerMessage::Welcome { id: id.clone() })
            .await;
        self.notifier
            .broadcast(&added.others, &ServerMessage::PeerJoined { id })
            .await;

        if added.needs_recovery {
            if let Some(snapshot) = self.sync.recover(&room_id).await {
                if let Err(e) = self.repository.hydrate(&room_id, snapshot).await {
                    tracing::warn!("Failed to restore room '{}': {}", room_id, e);
                }
            }
        }

        self.send_current_state(connection_id, &room_id).await;
        Ok(())
    }

    /// 遅れて参加したメンバーに現在の状態を送る
    async fn send_current_state(&self, connection_id: ConnectionId, room_id: &RoomId) {
        let Some(room) = self.repository.get_room(room_id).await else {
            return;
        };

        if let Some(game) = room.game {
            self.notifier
                .send(connection_id, &ServerMessage::GameSelected { game })
                .await;
        }
        if let Some(activity) = room.activity {
            self.notifier
                .send(connection_id, &ServerMessage::ActivitySelected { activity })
                .await;
        }
        if let Some(table) = room.table {
            self.notifier
                .send(
                    connection_id,
                    &ServerMessage::SeatUpdate {
                        table_state: TableStateDto::from(&table),
                    },
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestContext, drain};

    #[tokio::test]
    async fn test_join_sends_welcome_and_notifies_others() {
        // テスト項目: 参加者に welcome が届き、既存のメンバーに peer-joined が届く
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;
        let (bob, mut bob_rx) = ctx.connect(2).await;
        ctx.join_room.execute(alice, "r1".to_string()).await.unwrap();
        drain(&mut alice_rx);

        // when (操作):
        ctx.join_room.execute(bob, "r1".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            drain(&mut bob_rx),
            vec![ServerMessage::Welcome {
                id: "2".to_string()
            }]
        );
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerMessage::PeerJoined {
                id: "2".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_join_empty_room_is_rejected() {
        // テスト項目: 空のルーム名での参加はエラーになり、何も送られない
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;

        // when (操作):
        let result = ctx.join_room.execute(alice, String::new()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinError::InvalidRoom(_))));
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_join_another_room_leaves_previous() {
        // テスト項目: 別のルームに参加すると前のルームのメンバーに peer-left が届く
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, _alice_rx) = ctx.connect(1).await;
        let (bob, mut bob_rx) = ctx.connect(2).await;
        ctx.join_room.execute(alice, "r1".to_string()).await.unwrap();
        ctx.join_room.execute(bob, "r1".to_string()).await.unwrap();
        drain(&mut bob_rx);

        // when (操作):
        ctx.join_room.execute(alice, "r2".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            drain(&mut bob_rx),
            vec![ServerMessage::PeerLeft {
                id: "1".to_string()
            }]
        );
        assert_eq!(
            ctx.repository.room_of(alice).await,
            Some(RoomId::new("r2".to_string()).unwrap())
        );
    }

    #[tokio::test]
    async fn test_late_joiner_recovers_persisted_state() {
        // テスト項目: ルームを知らないプロセスに参加しても、保存済みの状態が参加者に送られる
        // given (前提条件): 別プロセス a がゲームとアクティビティを選択して保存済み
        let a = TestContext::new();
        let b = TestContext::with_backend(a.backend.clone(), "instance-b");
        let (alice, _alice_rx) = a.connect(1).await;
        a.join_room.execute(alice, "r1".to_string()).await.unwrap();
        a.repository
            .select_game(&RoomId::new("r1".to_string()).unwrap(), "hearts".to_string(), None)
            .await
            .unwrap();
        a.repository
            .select_activity(&RoomId::new("r1".to_string()).unwrap(), "cards".to_string())
            .await
            .unwrap();
        a.sync.persist(&RoomId::new("r1".to_string()).unwrap()).await;

        // when (操作):
        let (carol, mut carol_rx) = b.connect(1).await;
        b.join_room.execute(carol, "r1".to_string()).await.unwrap();

        // then (期待する結果):
        let messages = drain(&mut carol_rx);
        assert_eq!(
            messages[..3],
            [
                ServerMessage::Welcome {
                    id: "1".to_string()
                },
                ServerMessage::GameSelected {
                    game: "hearts".to_string()
                },
                ServerMessage::ActivitySelected {
                    activity: "cards".to_string()
                },
            ]
        );
        assert!(matches!(
            &messages[3],
            ServerMessage::SeatUpdate { table_state } if table_state.seats.len() == 4
        ));
    }
}
