//! UseCase: ルームからの退出
//!
//! 残りのメンバーに `peer-left` を配信し、空になったルームの後始末を行います。
//!
//! | テーブルの状態 | ローカルの状態 | スナップショット |
//! |---|---|---|
//! | finished | 破棄 | 削除 |
//! | started | 保持 | 保持 |
//! | それ以外 / なし | 破棄 | TTL で失効 |

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;

use crate::domain::{ConnectionId, MessagePusher, RoomCleanup, RoomId, RoomRepository};

use super::{notifier::Notifier, sync::CrossInstanceSync};

pub struct LeaveRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
    sync: Arc<CrossInstanceSync>,
}

impl LeaveRoomUseCase {
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

    /// 接続をルームから外す。どのルームにも所属していなければ何もしない
    ///
    /// # Returns
    ///
    /// 退出したルーム
    pub async fn execute(&self, connection_id: ConnectionId) -> Option<RoomId> {
        let removed = self.repository.remove_member(connection_id).await?;
        tracing::info!(
            "Connection '{}' left room '{}' (remaining: {})",
            connection_id,
            removed.room_id,
            removed.remaining.len()
        );

        self.notifier
            .broadcast(
                &removed.remaining,
                &ServerMessage::PeerLeft {
                    id: connection_id.to_string(),
                },
            )
            .await;

        if removed.cleanup == RoomCleanup::DeleteSnapshot {
            self.sync.delete_snapshot(&removed.room_id).await;
        }

        Some(removed.room_id)
    }
}
