//! UseCase のテスト用ヘルパー

use std::sync::Arc;

use gameface_shared::protocol::ServerMessage;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, InstanceId, MessagePusher},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        sync_backend::InMemorySyncBackend,
    },
};

use super::{
    CardTableUseCase, JoinRoomUseCase, LeaveRoomUseCase, ReadinessUseCase, RelaySignalUseCase,
    SelectActivityUseCase, SelectGameUseCase,
    sync::{CrossInstanceSync, DEFAULT_SNAPSHOT_TTL},
};

/// 1 つのサーバープロセス分の UseCase 一式
pub struct TestContext {
    pub repository: Arc<InMemoryRoomRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub backend: InMemorySyncBackend,
    pub sync: Arc<CrossInstanceSync>,
    pub join_room: JoinRoomUseCase,
    pub leave_room: Arc<LeaveRoomUseCase>,
    pub select_game: SelectGameUseCase,
    pub select_activity: SelectActivityUseCase,
    pub card_table: CardTableUseCase,
    pub relay: RelaySignalUseCase,
    pub readiness: ReadinessUseCase,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_backend(InMemorySyncBackend::new(), "instance-a")
    }

    /// 同じブローカーを共有する別プロセスを作るときに使う
    pub fn with_backend(backend: InMemorySyncBackend, instance: &str) -> Self {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let sync = Arc::new(CrossInstanceSync::new(
            Arc::new(backend.clone()),
            InstanceId::new(instance.to_string()),
            DEFAULT_SNAPSHOT_TTL,
            repository.clone(),
            pusher.clone(),
        ));
        let leave_room = Arc::new(LeaveRoomUseCase::new(
            repository.clone(),
            pusher.clone(),
            sync.clone(),
        ));

        Self {
            join_room: JoinRoomUseCase::new(
                repository.clone(),
                pusher.clone(),
                sync.clone(),
                leave_room.clone(),
            ),
            select_game: SelectGameUseCase::new(repository.clone(), pusher.clone(), sync.clone()),
            select_activity: SelectActivityUseCase::new(
                repository.clone(),
                pusher.clone(),
                sync.clone(),
            ),
            card_table: CardTableUseCase::new(repository.clone(), pusher.clone(), sync.clone()),
            relay: RelaySignalUseCase::new(repository.clone(), pusher.clone()),
            readiness: ReadinessUseCase::new(repository.clone(), pusher.clone()),
            leave_room,
            repository,
            pusher,
            backend,
            sync,
        }
    }

    /// 接続を登録し、その接続に届くメッセージの受信側を返す
    pub async fn connect(&self, id: u64) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = ConnectionId::new(id);
        let (tx, rx) = mpsc::unbounded_channel();
        self.pusher.register_client(connection_id, tx).await;
        (connection_id, rx)
    }
}

/// 受信済みのメッセージをすべて取り出す
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(text) = rx.try_recv() {
        messages.push(serde_json::from_str(&text).expect("server message should be valid JSON"));
    }
    messages
}
