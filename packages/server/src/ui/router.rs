//! Signaling Router
//!
//! WebSocket から届いたテキストフレームをデコードし、種類ごとの UseCase に振り分けます。
//!
//! - JSON でないフレーム、必須フィールドが欠けたフレームはログに残して破棄する
//! - `type` がない・知らない種類のフレームは送信者にそのまま返す
//! - UseCase のエラー（ルーム未参加など）もログに残すだけで、接続は閉じない

use std::sync::Arc;

use gameface_shared::protocol::{ClientMessage, InboundFrame, decode_client_frame};
use thiserror::Error;

use crate::{
    domain::ConnectionId,
    usecase::{
        CardTableUseCase, JoinError, JoinRoomUseCase, LeaveRoomUseCase, Notifier,
        ReadinessUseCase, RelaySignalUseCase, RoomActionError, SelectActivityUseCase,
        SelectGameUseCase, Signal,
    },
};

#[derive(Debug, Error)]
enum RouteError {
    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    RoomAction(#[from] RoomActionError),
}

pub struct SignalingRouter {
    join_room: Arc<JoinRoomUseCase>,
    leave_room: Arc<LeaveRoomUseCase>,
    select_game: Arc<SelectGameUseCase>,
    select_activity: Arc<SelectActivityUseCase>,
    card_table: Arc<CardTableUseCase>,
    relay: Arc<RelaySignalUseCase>,
    readiness: Arc<ReadinessUseCase>,
    notifier: Notifier,
}

impl SignalingRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        join_room: Arc<JoinRoomUseCase>,
        leave_room: Arc<LeaveRoomUseCase>,
        select_game: Arc<SelectGameUseCase>,
        select_activity: Arc<SelectActivityUseCase>,
        card_table: Arc<CardTableUseCase>,
        relay: Arc<RelaySignalUseCase>,
        readiness: Arc<ReadinessUseCase>,
        notifier: Notifier,
    ) -> Self {
        Self {
            join_room,
            leave_room,
            select_game,
            select_activity,
            card_table,
            relay,
            readiness,
            notifier,
        }
    }

    /// 1 つのテキストフレームを処理する
    pub async fn route(&self, from: ConnectionId, text: &str) {
        let message = match decode_client_frame(text) {
            Ok(InboundFrame::Message(message)) => message,
            Ok(InboundFrame::Unrecognized) => {
                tracing::debug!("Echoing unrecognized frame back to '{}'", from);
                self.notifier.send_raw(from, text).await;
                return;
            }
            Err(e) => {
                tracing::warn!("Dropping frame from '{}': {}", from, e);
                return;
            }
        };

        let kind = message.kind();
        tracing::debug!("Received '{}' from '{}'", kind, from);
        if let Err(e) = self.dispatch(from, message).await {
            tracing::warn!("Dropped '{}' from '{}': {}", kind, from, e);
        }
    }

    async fn dispatch(&self, from: ConnectionId, message: ClientMessage) -> Result<(), RouteError> {
        match message {
            ClientMessage::Join { room } => self.join_room.execute(from, room).await?,
            ClientMessage::Leave => {
                self.leave_room.execute(from).await;
            }
            ClientMessage::SelectGame { game, players } => {
                self.select_game.execute(from, game, players).await?
            }
            ClientMessage::SelectActivity { activity } => {
                self.select_activity.execute(from, activity).await?
            }
            ClientMessage::SeatClaim {
                seat_index,
                player_id,
                table_id,
            } => {
                self.card_table
                    .claim(from, seat_index, player_id, table_id)
                    .await?
            }
            ClientMessage::SeatRelease {
                seat_index,
                player_id,
                table_id,
            } => {
                self.card_table
                    .release(from, seat_index, player_id, table_id)
                    .await?
            }
            ClientMessage::SeatUpdate { table_state } => {
                self.card_table.overwrite(from, &table_state).await?
            }
            ClientMessage::TableStart { table_state } => {
                self.card_table.start(from, table_state.as_ref()).await?
            }
            ClientMessage::TableFinish => self.card_table.finish(from).await?,
            ClientMessage::Offer { sdp, target } => {
                self.relay.execute(from, Signal::Offer(sdp), target).await?
            }
            ClientMessage::Answer { sdp, target } => {
                self.relay.execute(from, Signal::Answer(sdp), target).await?
            }
            ClientMessage::Candidate { candidate, target } => {
                self.relay
                    .execute(from, Signal::Candidate(candidate), target)
                    .await?
            }
            ClientMessage::Ready => self.readiness.ready(from).await?,
            ClientMessage::StartGame => self.readiness.start_game(from).await?,
        }
        Ok(())
    }
}
