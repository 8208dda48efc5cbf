//! UseCase: ソケット切断
//!
//! ルームから退出させてから MessagePusher の登録を解除します。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher};

use super::leave_room::LeaveRoomUseCase;

pub struct DisconnectUseCase {
    leave_room: Arc<LeaveRoomUseCase>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectUseCase {
    pub fn new(leave_room: Arc<LeaveRoomUseCase>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            leave_room,
            message_pusher,
        }
    }

    pub async fn execute(&self, connection_id: ConnectionId) {
        self.leave_room.execute(connection_id).await;
        self.message_pusher.unregister_client(connection_id).await;
        tracing::info!("Connection '{}' disconnected", connection_id);
    }
}
