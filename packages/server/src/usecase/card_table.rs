//! UseCase: カードテーブルの操作
//!
//! 座席の確保・解放、テーブルの上書き、開始、終了を扱います。
//! 状態が変わった操作はルーム全員に配信したあと、他プロセスへ publish して保存します。
//! 開始が拒否された場合は結果の配信だけを行い、状態は変えません。

use std::sync::Arc;

use gameface_shared::protocol::{ServerMessage, TableStateDto};
use serde_json::Value;

use crate::{
    domain::{
        ConnectionId, MessagePusher, PlayerId, RoomId, RoomRepository, SeatOutcome, TableCommand,
        TableOutcome, TableState, TableUpdate,
    },
    infrastructure::dto::store::EventPayload,
};

use super::{error::RoomActionError, notifier::Notifier, sync::CrossInstanceSync};

pub struct CardTableUseCase {
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
    sync: Arc<CrossInstanceSync>,
}

impl CardTableUseCase {
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

    /// 空いている座席を確保する
    ///
    /// 他のプレイヤーが座っている座席は確保できない。拒否された場合も
    /// 現在のテーブルが配信される。
    pub async fn claim(
        &self,
        connection_id: ConnectionId,
        seat_index: usize,
        player_id: String,
        table_id: Option<String>,
    ) -> Result<(), RoomActionError> {
        let player_id = PlayerId::new(player_id)?;
        let room_id = self.room_of(connection_id).await?;
        let command = TableCommand::Claim {
            seat_index,
            player_id: player_id.clone(),
            table_id,
        };
        let update = self.update(&room_id, command).await?;
        if update.outcome == TableOutcome::Seat(SeatOutcome::Rejected) {
            tracing::info!(
                "Seat {} in room '{}' could not be claimed by '{}'",
                seat_index,
                room_id,
                player_id
            );
        }
        self.share_table(&room_id, &update).await;
        Ok(())
    }

    /// 自分が座っている座席を解放する
    pub async fn release(
        &self,
        connection_id: ConnectionId,
        seat_index: usize,
        player_id: String,
        table_id: Option<String>,
    ) -> Result<(), RoomActionError> {
        let player_id = PlayerId::new(player_id)?;
        let room_id = self.room_of(connection_id).await?;
        let command = TableCommand::Release {
            seat_index,
            player_id: player_id.clone(),
            table_id,
        };
        let update = self.update(&room_id, command).await?;
        if update.outcome == TableOutcome::Seat(SeatOutcome::Rejected) {
            tracing::info!(
                "Seat {} in room '{}' is not held by '{}'",
                seat_index,
                room_id,
                player_id
            );
        }
        self.share_table(&room_id, &update).await;
        Ok(())
    }

    /// クライアントが送ってきたテーブルで無条件に上書きする
    pub async fn overwrite(
        &self,
        connection_id: ConnectionId,
        raw: &Value,
    ) -> Result<(), RoomActionError> {
        let room_id = self.room_of(connection_id).await?;
        let table = TableState::normalize(raw);
        let update = self
            .update(&room_id, TableCommand::Overwrite(table))
            .await?;
        self.share_table(&room_id, &update).await;
        Ok(())
    }

    /// ゲームの開始を試み、結果をルーム全員に配信する
    ///
    /// テーブルがまだない場合は、クライアントが送ってきたテーブル
    /// （なければ既定の空テーブル）で判定する。
    pub async fn start(
        &self,
        connection_id: ConnectionId,
        raw: Option<&Value>,
    ) -> Result<(), RoomActionError> {
        let room_id = self.room_of(connection_id).await?;
        let fallback = raw.map(TableState::normalize);
        let update = self
            .update(&room_id, TableCommand::Start { fallback })
            .await?;
        let TableOutcome::Start(verdict) = &update.outcome else {
            return Ok(());
        };

        let table_state = TableStateDto::from(&update.table);
        self.notifier
            .broadcast(
                &update.members,
                &ServerMessage::TableStart {
                    ok: verdict.ok,
                    reason: verdict.reason.clone(),
                    table_state: table_state.clone(),
                },
            )
            .await;

        if verdict.ok {
            tracing::info!("Table in room '{}' started", room_id);
            self.sync
                .publish(&room_id, EventPayload::TableStart { table_state })
                .await;
            self.sync.persist(&room_id).await;
        } else {
            tracing::info!(
                "Table in room '{}' could not start: {}",
                room_id,
                verdict.reason.as_deref().unwrap_or_default()
            );
        }
        Ok(())
    }

    /// テーブルを終了状態にする
    pub async fn finish(&self, connection_id: ConnectionId) -> Result<(), RoomActionError> {
        let room_id = self.room_of(connection_id).await?;
        let update = self.update(&room_id, TableCommand::Finish).await?;
        let table_state = TableStateDto::from(&update.table);
        self.notifier
            .broadcast(
                &update.members,
                &ServerMessage::SeatUpdate {
                    table_state: table_state.clone(),
                },
            )
            .await;

        if update.outcome == (TableOutcome::Finish { changed: true }) {
            tracing::info!("Table in room '{}' finished", room_id);
            self.sync
                .publish(&room_id, EventPayload::SeatUpdate { table_state })
                .await;
            self.sync.persist(&room_id).await;
        }
        Ok(())
    }

    async fn room_of(&self, connection_id: ConnectionId) -> Result<RoomId, RoomActionError> {
        self.repository
            .room_of(connection_id)
            .await
            .ok_or(RoomActionError::NotInRoom(connection_id))
    }

    async fn update(
        &self,
        room_id: &RoomId,
        command: TableCommand,
    ) -> Result<TableUpdate, RoomActionError> {
        self.repository
            .update_table(room_id, command)
            .await?
            .ok_or_else(|| RoomActionError::NoTable(room_id.clone()))
    }

    /// テーブルを配信し、他プロセスへ publish して保存する
    async fn share_table(&self, room_id: &RoomId, update: &TableUpdate) {
        let table_state = TableStateDto::from(&update.table);
        self.notifier
            .broadcast(
                &update.members,
                &ServerMessage::SeatUpdate {
                    table_state: table_state.clone(),
                },
            )
            .await;
        self.sync
            .publish(room_id, EventPayload::SeatUpdate { table_state })
            .await;
        self.sync.persist(room_id).await;
    }
}
