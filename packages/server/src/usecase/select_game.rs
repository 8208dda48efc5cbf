//! UseCase: ゲームの選択
//!
//! 新しいテーブルを作って以前のテーブルを破棄し、ready の集合をリセットします。
//! `game-selected` と新しいテーブルをメンバーに配信し、他プロセスへ publish して保存します。

use std::sync::Arc;

use gameface_shared::protocol::{ServerMessage, TableStateDto};

use crate::{
    domain::{ConnectionId, MAX_SEAT_COUNT, MessagePusher, RoomRepository},
    infrastructure::dto::store::EventPayload,
};

use super::{error::RoomActionError, notifier::Notifier, sync::CrossInstanceSync};

pub struct SelectGameUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
    sync: Arc<CrossInstanceSync>,
}

impl SelectGameUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        sync: Arc<CrossInstanceSync>,
    ) -> Self {
        Self {
            repository,
            notifier: Notifier::new(message_pusher),
            sync,
        }
    }

    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        game: String,
        players: Option<usize>,
    ) -> Result<(), RoomActionError> {
        if game.is_empty() {
            return Err(RoomActionError::EmptyField("game"));
        }
        if let Some(requested) = players.filter(|players| *players > MAX_SEAT_COUNT) {
            return Err(RoomActionError::TooManySeats {
                requested,
                max: MAX_SEAT_COUNT,
            });
        }
        let room_id = self
            .repository
            .room_of(connection_id)
            .await
            .ok_or(RoomActionError::NotInRoom(connection_id))?;

        let (table, members) = self
            .repository
            .select_game(&room_id, game.clone(), players)
            .await?;
        tracing::info!(
            "Room '{}' selected game '{}' ({} seats)",
            room_id,
            game,
            table.seats().len()
        );

        let table_state = TableStateDto::from(&table);
        self.notifier
            .broadcast(&members, &ServerMessage::GameSelected { game: game.clone() })
            .await;
        self.notifier
            .broadcast(
                &members,
                &ServerMessage::SeatUpdate {
                    table_state: table_state.clone(),
                },
            )
            .await;

        self.sync
            .publish(
                &room_id,
                EventPayload::GameSelected {
                    game,
                    table_state: Some(table_state),
                },
            )
            .await;
        self.sync.persist(&room_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestContext, drain};

    #[tokio::test]
    async fn test_select_game_broadcasts_new_table() {
        // テスト項目: ゲームを選ぶとカタログの座席数の新しいテーブルが全員に配信される
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;
        let (bob, mut bob_rx) = ctx.connect(2).await;
        ctx.join_room.execute(alice, "r1".to_string()).await.unwrap();
        ctx.join_room.execute(bob, "r1".to_string()).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        ctx.select_game
            .execute(alice, "custom".to_string(), None)
            .await
            .unwrap();

        // then (期待する結果):
        for rx in [&mut alice_rx, &mut bob_rx] {
            let messages = drain(rx);
            assert_eq!(
                messages[0],
                ServerMessage::GameSelected {
                    game: "custom".to_string()
                }
            );
            assert!(matches!(
                &messages[1],
                ServerMessage::SeatUpdate { table_state }
                    if table_state.seats.len() == 2
                        && table_state.game_id.as_deref() == Some("custom")
            ));
        }
    }

    #[tokio::test]
    async fn test_select_game_without_room() {
        // テスト項目: ルームに参加していない接続のゲーム選択は拒否される
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, _alice_rx) = ctx.connect(1).await;

        // when (操作):
        let result = ctx
            .select_game
            .execute(alice, "hearts".to_string(), None)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomActionError::NotInRoom(alice)));
    }

    #[tokio::test]
    async fn test_select_game_with_too_many_players_is_rejected() {
        // テスト項目: 上限を超える人数の指定は拒否され、テーブルは作られない
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;
        ctx.join_room.execute(alice, "r1".to_string()).await.unwrap();
        drain(&mut alice_rx);

        // when (操作):
        let result = ctx
            .select_game
            .execute(alice, "custom".to_string(), Some(MAX_SEAT_COUNT + 1))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RoomActionError::TooManySeats {
                requested: MAX_SEAT_COUNT + 1,
                max: MAX_SEAT_COUNT
            })
        );
        assert!(drain(&mut alice_rx).is_empty());
    }
}
