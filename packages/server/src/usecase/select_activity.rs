//! UseCase: アクティビティの選択

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;

use crate::{
    domain::{ConnectionId, MessagePusher, RoomRepository},
    infrastructure::dto::store::EventPayload,
};

use super::{error::RoomActionError, notifier::Notifier, sync::CrossInstanceSync};

pub struct SelectActivityUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
    sync: Arc<CrossInstanceSync>,
}

impl SelectActivityUseCase {
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
        activity: String,
    ) -> Result<(), RoomActionError> {
        if activity.is_empty() {
            return Err(RoomActionError::EmptyField("activity"));
        }
        let room_id = self
            .repository
            .room_of(connection_id)
            .await
            .ok_or(RoomActionError::NotInRoom(connection_id))?;

        let members = self
            .repository
            .select_activity(&room_id, activity.clone())
            .await?;
        tracing::info!("Room '{}' selected activity '{}'", room_id, activity);

        self.notifier
            .broadcast(
                &members,
                &ServerMessage::ActivitySelected {
                    activity: activity.clone(),
                },
            )
            .await;
        self.sync
            .publish(&room_id, EventPayload::ActivitySelected { activity })
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
    async fn test_select_activity_broadcasts_to_room() {
        // テスト項目: 選んだアクティビティが本人を含むルーム全員に届く
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, mut alice_rx) = ctx.connect(1).await;
        ctx.join_room.execute(alice, "r1".to_string()).await.unwrap();
        drain(&mut alice_rx);

        // when (操作):
        ctx.select_activity
            .execute(alice, "video".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerMessage::ActivitySelected {
                activity: "video".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_select_empty_activity_is_rejected() {
        // テスト項目: 空のアクティビティは拒否される
        // given (前提条件):
        let ctx = TestContext::new();
        let (alice, _alice_rx) = ctx.connect(1).await;
        ctx.join_room.execute(alice, "r1".to_string()).await.unwrap();

        // when (操作):
        let result = ctx.select_activity.execute(alice, String::new()).await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomActionError::EmptyField("activity")));
    }
}
