//! Cross-Instance Sync
//!
//! ルーム単位の事実（選択中のゲーム・アクティビティ・テーブル）を、同じルームを
//! 担当するすべてのサーバープロセスの間で結果整合させ、再起動や遅れて参加した
//! メンバーのために TTL 付きで永続化します。
//!
//! ## 障害時の方針
//!
//! publish / persist / subscribe / get の失敗はすべてログに残すだけで、呼び出し側の
//! 処理は続行します。外部ストアが使えない間は単一プロセスとして振る舞います
//! （他プロセスへの配信と復元だけが失われる）。
//!
//! 応答しないストアで接続ごとの処理が止まらないよう、ストアへの呼び出しは
//! すべて `store_timeout` で打ち切り、失敗として扱います。

use std::{future::Future, sync::Arc, time::Duration};

use gameface_shared::protocol::{ServerMessage, TableStateDto};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{
        ChannelMessage, InstanceId, MessagePusher, RemoteUpdate, RoomId, RoomRepository,
        RoomSnapshot, SyncBackend, SyncError, TableState,
    },
    infrastructure::dto::store::{
        EventPayload, PublishedEvent, ROOM_CHANNEL_PATTERN, RoomSnapshotDto, room_channel,
        room_state_key,
    },
};

use super::notifier::Notifier;

/// スナップショットの既定の TTL（24 時間）
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// ストアへの 1 回の呼び出しを打ち切るまでの時間
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// 購読が途切れたときに再購読するまでの間隔
const RESUBSCRIBE_INTERVAL: Duration = Duration::from_secs(5);

pub struct CrossInstanceSync {
    backend: Arc<dyn SyncBackend>,
    instance_id: InstanceId,
    snapshot_ttl: Duration,
    store_timeout: Duration,
    repository: Arc<dyn RoomRepository>,
    notifier: Notifier,
}

impl CrossInstanceSync {
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        instance_id: InstanceId,
        snapshot_ttl: Duration,
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            backend,
            instance_id,
            snapshot_ttl,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            repository,
            notifier: Notifier::new(message_pusher),
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// イベントにインスタンス ID を付けてルームのチャンネルに publish する
    pub async fn publish(&self, room_id: &RoomId, payload: EventPayload) {
        let event = PublishedEvent {
            source: self.instance_id.as_str().to_string(),
            room: room_id.as_str().to_string(),
            payload,
        };
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize event for room '{}': {}", room_id, e);
                return;
            }
        };

        let channel = room_channel(room_id.as_str());
        if self
            .bounded("publish", self.backend.publish(&channel, &text))
            .await
            .is_some()
        {
            tracing::debug!("Published to {}: {}", channel, text);
        }
    }

    /// ルームの現在の状態を TTL 付きで保存する（冪等な upsert）
    pub async fn persist(&self, room_id: &RoomId) {
        let Some(snapshot) = self.repository.snapshot(room_id).await else {
            tracing::debug!("Room '{}' has no local state, nothing to persist", room_id);
            return;
        };
        let text = match serde_json::to_string(&RoomSnapshotDto::from(&snapshot)) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize snapshot of room '{}': {}", room_id, e);
                return;
            }
        };

        let key = room_state_key(room_id.as_str());
        self.bounded(
            "persist",
            self.backend.set_with_ttl(&key, &text, self.snapshot_ttl),
        )
        .await;
    }

    /// 保存されているスナップショットを読み込む
    pub async fn recover(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let key = room_state_key(room_id.as_str());
        let text = self.bounded("recover", self.backend.get(&key)).await??;

        match serde_json::from_str::<RoomSnapshotDto>(&text) {
            Ok(dto) => {
                tracing::info!("Recovered persisted state of room '{}'", room_id);
                Some(dto.into())
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot of room '{}': {}", room_id, e);
                None
            }
        }
    }

    pub async fn delete_snapshot(&self, room_id: &RoomId) {
        let key = room_state_key(room_id.as_str());
        if self
            .bounded("delete", self.backend.del(&key))
            .await
            .is_some()
        {
            tracing::info!("Deleted persisted state of finished room '{}'", room_id);
        }
    }

    /// 他プロセスから届いたイベントを適用し、ローカルのメンバーに配信する
    ///
    /// 自分が publish したイベント、デコードできないイベント、このプロセスが
    /// 保持していないルームのイベントは無視する。適用した場合は `true`。
    pub async fn handle_remote(&self, message: ChannelMessage) -> bool {
        let event = match serde_json::from_str::<PublishedEvent>(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping undecodable event on {}: {}", message.channel, e);
                return false;
            }
        };

        if event.source == self.instance_id.as_str() {
            return false;
        }

        let room_id = match RoomId::new(event.room) {
            Ok(room_id) => room_id,
            Err(e) => {
                tracing::warn!("Dropping event from '{}': {}", event.source, e);
                return false;
            }
        };

        let (update, messages) = remote_update(event.payload);
        let Some(members) = self.repository.apply_remote(&room_id, update).await else {
            tracing::debug!("No local state for room '{}', remote event skipped", room_id);
            return false;
        };

        tracing::debug!(
            "Applied remote event from '{}' to room '{}'",
            event.source,
            room_id
        );
        for message in &messages {
            self.notifier.broadcast(&members, message).await;
        }
        true
    }

    /// 全ルームのチャンネルを購読し、受信ループを開始する
    ///
    /// 最初の購読はこの関数の中で試みる（`store_timeout` で打ち切る）。購読が
    /// 途切れた場合や失敗した場合は、バックグラウンドで一定間隔で再購読を試みる。
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        let first = self.subscribe().await;

        tokio::spawn(async move {
            let mut current = first;
            loop {
                if let Some(mut receiver) = current.take() {
                    while let Some(message) = receiver.recv().await {
                        self.handle_remote(message).await;
                    }
                    tracing::warn!("Subscription to {} closed", ROOM_CHANNEL_PATTERN);
                }
                tokio::time::sleep(RESUBSCRIBE_INTERVAL).await;
                current = self.subscribe().await;
            }
        })
    }

    async fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<ChannelMessage>> {
        let receiver = match self.bounded("connect", self.backend.connect()).await {
            Some(()) => {
                self.bounded(
                    "subscribe",
                    self.backend.psubscribe(ROOM_CHANNEL_PATTERN),
                )
                .await
            }
            None => None,
        };

        match &receiver {
            Some(_) => tracing::info!(
                "Subscribed to {} as instance '{}'",
                ROOM_CHANNEL_PATTERN,
                self.instance_id
            ),
            None => tracing::warn!("Running without cross-instance sync"),
        }
        receiver
    }

    /// ストアへの呼び出しを `store_timeout` で打ち切り、失敗はログに残して `None` にする
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, SyncError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::error!("{}", e);
                None
            }
            Err(_) => {
                tracing::error!(
                    "Store {} timed out after {:?}",
                    operation,
                    self.store_timeout
                );
                None
            }
        }
    }
}

/// イベントのペイロードを、ローカルに適用する変更と配信するメッセージに変換
fn remote_update(payload: EventPayload) -> (RemoteUpdate, Vec<ServerMessage>) {
    match payload {
        EventPayload::GameSelected { game, table_state } => {
            let table = table_state.map(TableState::from);
            let mut messages = vec![ServerMessage::GameSelected { game: game.clone() }];
            if let Some(table) = &table {
                messages.push(ServerMessage::SeatUpdate {
                    table_state: TableStateDto::from(table),
                });
            }
            (RemoteUpdate::GameSelected { game, table }, messages)
        }
        EventPayload::ActivitySelected { activity } => (
            RemoteUpdate::ActivitySelected(activity.clone()),
            vec![ServerMessage::ActivitySelected { activity }],
        ),
        EventPayload::SeatUpdate { table_state } => {
            let table = TableState::from(table_state);
            let message = ServerMessage::SeatUpdate {
                table_state: TableStateDto::from(&table),
            };
            (RemoteUpdate::Table(table), vec![message])
        }
        EventPayload::TableStart { table_state } => {
            let table = TableState::from(table_state);
            let message = ServerMessage::TableStart {
                ok: true,
                reason: None,
                table_state: TableStateDto::from(&table),
            };
            (RemoteUpdate::Table(table), vec![message])
        }
    }
}
