//! Server state and dependency wiring.

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{InstanceId, SyncBackend},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
    },
    usecase::{
        CardTableUseCase, ConnectUseCase, CrossInstanceSync, DisconnectUseCase, JoinRoomUseCase,
        LeaveRoomUseCase, Notifier, ReadinessUseCase, RelaySignalUseCase, SelectActivityUseCase,
        SelectGameUseCase,
    },
};

use super::router::SignalingRouter;

/// Shared application state
pub struct AppState {
    /// ConnectUseCase（ソケット接続のユースケース）
    pub connect: Arc<ConnectUseCase>,
    /// DisconnectUseCase（ソケット切断のユースケース）
    pub disconnect: Arc<DisconnectUseCase>,
    /// 受信したフレームの振り分け
    pub router: Arc<SignalingRouter>,
    /// 他プロセスとの同期
    pub sync: Arc<CrossInstanceSync>,
}

impl AppState {
    /// 依存関係を組み立てる
    ///
    /// 1. Repository
    /// 2. MessagePusher
    /// 3. CrossInstanceSync
    /// 4. UseCases
    /// 5. SignalingRouter
    pub fn build(
        backend: Arc<dyn SyncBackend>,
        instance_id: InstanceId,
        snapshot_ttl: Duration,
    ) -> Self {
        // 1. Create Repository (in-memory room registry)
        let repository = Arc::new(InMemoryRoomRepository::new());

        // 2. Create MessagePusher (WebSocket implementation)
        let message_pusher = Arc::new(WebSocketMessagePusher::new());

        // 3. Create CrossInstanceSync
        let sync = Arc::new(CrossInstanceSync::new(
            backend,
            instance_id,
            snapshot_ttl,
            repository.clone(),
            message_pusher.clone(),
        ));

        // 4. Create UseCases
        let leave_room = Arc::new(LeaveRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            sync.clone(),
        ));
        let join_room = Arc::new(JoinRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            sync.clone(),
            leave_room.clone(),
        ));
        let select_game = Arc::new(SelectGameUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            sync.clone(),
        ));
        let select_activity = Arc::new(SelectActivityUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            sync.clone(),
        ));
        let card_table = Arc::new(CardTableUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            sync.clone(),
        ));
        let relay = Arc::new(RelaySignalUseCase::new(
            repository.clone(),
            message_pusher.clone(),
        ));
        let readiness = Arc::new(ReadinessUseCase::new(repository, message_pusher.clone()));
        let connect = Arc::new(ConnectUseCase::new(message_pusher.clone()));
        let disconnect = Arc::new(DisconnectUseCase::new(
            leave_room.clone(),
            message_pusher.clone(),
        ));

        // 5. Create SignalingRouter
        let router = Arc::new(SignalingRouter::new(
            join_room,
            leave_room,
            select_game,
            select_activity,
            card_table,
            relay,
            readiness,
            Notifier::new(message_pusher),
        ));

        Self {
            connect,
            disconnect,
            router,
            sync,
        }
    }
}
