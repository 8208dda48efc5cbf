//! UseCase: 準備完了とゲーム開始の合図

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;

use crate::domain::{ConnectionId, MessagePusher, ReadyOutcome, RoomId, RoomRepository};

use super::{error::RoomActionError, notifier::Notifier};

pub struct ReadinessUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
}

impl ReadinessUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            notifier: Notifier::new(message_pusher),
        }
    }

    /// 準備完了を記録し、全員がそろったら `all-ready` を配信する
    pub async fn ready(&self, connection_id: ConnectionId) -> Result<(), RoomActionError> {
        let room_id = self.room_of(connection_id).await?;
        let (outcome, members) = self.repository.mark_ready(&room_id, connection_id).await?;
        let all_ready = match outcome {
            ReadyOutcome::NoGameSelected => return Err(RoomActionError::NoGameSelected(room_id)),
            ReadyOutcome::Marked { all_ready } => all_ready,
        };

        self.notifier
            .broadcast(
                &members,
                &ServerMessage::Ready {
                    id: connection_id.to_string(),
                },
            )
            .await;
        if all_ready {
            tracing::info!("All members of room '{}' are ready", room_id);
            self.notifier
                .broadcast(&members, &ServerMessage::AllReady)
                .await;
        }
        Ok(())
    }

    /// 選択中のゲームの開始をルーム全員に知らせる
    pub async fn start_game(&self, connection_id: ConnectionId) -> Result<(), RoomActionError> {
        let room_id = self.room_of(connection_id).await?;
        let room = self
            .repository
            .get_room(&room_id)
            .await
            .ok_or_else(|| RoomActionError::NoGameSelected(room_id.clone()))?;
        let game = room
            .game
            .clone()
            .ok_or_else(|| RoomActionError::NoGameSelected(room_id.clone()))?;

        self.notifier
            .broadcast(&room.members(), &ServerMessage::StartGame { game })
            .await;
        Ok(())
    }

    async fn room_of(&self, connection_id: ConnectionId) -> Result<RoomId, RoomActionError> {
        self.repository
            .room_of(connection_id)
            .await
            .ok_or(RoomActionError::NotInRoom(connection_id))
    }
}
