//! Integration tests for the signaling server.
//!
//! Servers run in-process on ephemeral ports. Several servers sharing one
//! in-memory broker stand in for several instances sharing a Redis store.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use gameface_server::{
    domain::{InstanceId, SyncBackend},
    infrastructure::{dto::store::room_state_key, sync_backend::{InMemorySyncBackend, RedisSyncBackend}},
    ui::{AppState, Server},
    usecase::DEFAULT_SNAPSHOT_TTL,
};
use gameface_shared::protocol::{ServerMessage, TableStatusDto};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper struct to manage an in-process server's lifecycle
struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    /// Start a server on an ephemeral port using the given broker
    async fn start(backend: InMemorySyncBackend) -> Self {
        Self::start_with(Arc::new(backend)).await
    }

    /// Start a server on an ephemeral port using any store backend
    async fn start_with(backend: Arc<dyn SyncBackend>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let state = AppState::build(
            backend,
            InstanceId::generate(),
            DEFAULT_SNAPSHOT_TTL,
        );
        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(Server::new(state).serve(listener, async move {
            let _ = signal.await;
        }));

        TestServer {
            addr,
            shutdown: Some(shutdown),
            handle,
        }
    }

    /// Get the WebSocket URL for this server
    fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
    }
}

/// Helper struct wrapping a WebSocket client connection
struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and consume the `hello` greeting
    async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.expect("Failed to connect");
        let mut client = TestClient { ws };
        let hello = client.recv().await;
        assert!(matches!(hello, ServerMessage::Hello { .. }));
        client
    }

    async fn send(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("Failed to send");
    }

    async fn recv_text(&mut self) -> String {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("Timed out waiting for a message")
                .expect("Connection closed")
                .expect("WebSocket error");
            if let Message::Text(text) = next {
                return text.as_str().to_string();
            }
        }
    }

    async fn recv(&mut self) -> ServerMessage {
        let text = self.recv_text().await;
        serde_json::from_str(&text).expect("Server sent an unknown message")
    }

    /// Receive messages until one matches
    async fn recv_until(&mut self, predicate: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let message = self.recv().await;
            if predicate(&message) {
                return message;
            }
        }
    }

    /// Join a room and return the assigned connection id
    async fn join(&mut self, room: &str) -> String {
        self.send(json!({"type": "join", "room": room})).await;
        match self.recv().await {
            ServerMessage::Welcome { id } => id,
            other => panic!("Expected welcome, got {:?}", other),
        }
    }

    async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

fn is_seat_update(message: &ServerMessage) -> bool {
    matches!(message, ServerMessage::SeatUpdate { .. })
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが status: ok を返す
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;

    // when (操作):
    let body: Value = reqwest::get(format!("http://{}/api/health", server.addr))
        .await
        .expect("Failed to request health check")
        .json()
        .await
        .expect("Health check should return JSON");

    // then (期待する結果):
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_root_path_also_serves_websocket() {
    // テスト項目: "/" でも WebSocket に接続でき hello が届く
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;

    // when (操作):
    let client = TestClient::connect(&format!("ws://{}/", server.addr)).await;

    // then (期待する結果):
    client.close().await;
}

#[tokio::test]
async fn test_join_notifies_existing_members() {
    // テスト項目: 参加者には welcome、既存のメンバーには peer-joined が届く
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    let mut bob = TestClient::connect(&server.url()).await;
    let alice_id = alice.join("room-a").await;

    // when (操作):
    let bob_id = bob.join("room-a").await;

    // then (期待する結果):
    assert_ne!(alice_id, bob_id);
    assert_eq!(alice.recv().await, ServerMessage::PeerJoined { id: bob_id });
}

#[tokio::test]
async fn test_close_notifies_peer_left() {
    // テスト項目: ソケットを閉じると残りのメンバーに peer-left が届く
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    let mut bob = TestClient::connect(&server.url()).await;
    alice.join("room-a").await;
    let bob_id = bob.join("room-a").await;
    alice.recv().await;

    // when (操作):
    bob.close().await;

    // then (期待する結果):
    assert_eq!(alice.recv().await, ServerMessage::PeerLeft { id: bob_id });
}

#[tokio::test]
async fn test_unrecognized_frame_is_echoed() {
    // テスト項目: 知らない type のフレームは送信者にそのまま返される
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    let frame = json!({"type": "debug-ping", "n": 1});

    // when (操作):
    alice.send(frame.clone()).await;

    // then (期待する結果):
    let echoed: Value = serde_json::from_str(&alice.recv_text().await).unwrap();
    assert_eq!(echoed, frame);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    // テスト項目: JSON でないフレームを送っても接続は閉じず、続くメッセージが処理される
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    alice
        .ws
        .send(Message::Text("{oops".to_string().into()))
        .await
        .unwrap();

    // when (操作):
    let id = alice.join("room-a").await;

    // then (期待する結果):
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_claim_conflict_rebroadcasts_truth() {
    // テスト項目: 埋まっている座席への確保は拒否され、正しいテーブルが配信される
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    let mut bob = TestClient::connect(&server.url()).await;
    alice.join("room-a").await;
    bob.join("room-a").await;
    alice.recv().await;
    alice
        .send(json!({"type": "cardtable.seat.claim", "seatIndex": 0, "playerId": "alice"}))
        .await;
    alice.recv_until(is_seat_update).await;
    bob.recv_until(is_seat_update).await;

    // when (操作):
    bob.send(json!({"type": "cardtable.seat.claim", "seatIndex": 0, "playerId": "bob"}))
        .await;

    // then (期待する結果):
    let ServerMessage::SeatUpdate { table_state } = bob.recv_until(is_seat_update).await else {
        unreachable!();
    };
    assert_eq!(table_state.seats[0].player_id.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_start_with_empty_seats_is_rejected() {
    // テスト項目: 座席が埋まっていないテーブルの開始は理由付きで拒否される
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    alice.join("room-a").await;
    alice.send(json!({"type": "select-game", "game": "hearts"})).await;
    alice.recv_until(is_seat_update).await;

    // when (操作):
    alice.send(json!({"type": "cardtable.start"})).await;

    // then (期待する結果):
    match alice.recv().await {
        ServerMessage::TableStart {
            ok,
            reason,
            table_state,
        } => {
            assert!(!ok);
            assert_eq!(reason.as_deref(), Some("Seats not full"));
            assert_eq!(table_state.status, TableStatusDto::Lobby);
        }
        other => panic!("Expected cardtable.start, got {:?}", other),
    }
}

#[tokio::test]
async fn test_seat_claim_propagates_across_instances() {
    // テスト項目: 別のサーバーに接続しているメンバーにも座席の確保が伝わる
    // given (前提条件):
    let broker = InMemorySyncBackend::new();
    let server_a = TestServer::start(broker.clone()).await;
    let server_b = TestServer::start(broker.clone()).await;
    let mut alice = TestClient::connect(&server_a.url()).await;
    let mut bob = TestClient::connect(&server_b.url()).await;
    alice.join("room-x").await;
    bob.join("room-x").await;

    // when (操作):
    alice
        .send(json!({"type": "cardtable.seat.claim", "seatIndex": 0, "playerId": "alice"}))
        .await;

    // then (期待する結果):
    let ServerMessage::SeatUpdate { table_state } = bob.recv_until(is_seat_update).await else {
        unreachable!();
    };
    assert_eq!(table_state.seats[0].player_id.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_late_joiner_on_other_instance_recovers_state() {
    // テスト項目: ルームを知らないサーバーに後から参加しても、保存済みの状態が届く
    // given (前提条件):
    let broker = InMemorySyncBackend::new();
    let server_a = TestServer::start(broker.clone()).await;
    let mut alice = TestClient::connect(&server_a.url()).await;
    alice.join("room-y").await;
    alice.send(json!({"type": "select-game", "game": "spades"})).await;
    alice.recv_until(is_seat_update).await;
    alice
        .send(json!({"type": "select-activity", "activity": "cards"}))
        .await;
    alice
        .recv_until(|m| matches!(m, ServerMessage::ActivitySelected { .. }))
        .await;
    alice
        .send(json!({"type": "cardtable.seat.claim", "seatIndex": 2, "playerId": "alice"}))
        .await;
    alice.recv_until(is_seat_update).await;
    // persist runs right after the local broadcast
    tokio::time::sleep(Duration::from_millis(100)).await;

    // when (操作):
    let server_b = TestServer::start(broker.clone()).await;
    let mut carol = TestClient::connect(&server_b.url()).await;
    carol.join("room-y").await;

    // then (期待する結果):
    assert_eq!(
        carol.recv().await,
        ServerMessage::GameSelected {
            game: "spades".to_string()
        }
    );
    assert_eq!(
        carol.recv().await,
        ServerMessage::ActivitySelected {
            activity: "cards".to_string()
        }
    );
    let ServerMessage::SeatUpdate { table_state } = carol.recv().await else {
        panic!("Expected the recovered table");
    };
    assert_eq!(table_state.game_id.as_deref(), Some("spades"));
    assert_eq!(table_state.seats[2].player_id.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_finished_room_snapshot_is_deleted_when_empty() {
    // テスト項目: 終了したテーブルのルームが空になるとスナップショットが削除される
    // given (前提条件):
    let broker = InMemorySyncBackend::new();
    let server = TestServer::start(broker.clone()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    alice.join("room-z").await;
    alice
        .send(json!({"type": "select-game", "game": "custom", "players": 1}))
        .await;
    alice.recv_until(is_seat_update).await;
    alice
        .send(json!({"type": "cardtable.seat.claim", "seatIndex": 0, "playerId": "alice"}))
        .await;
    alice.recv_until(is_seat_update).await;
    alice.send(json!({"type": "cardtable.start"})).await;
    assert!(matches!(
        alice.recv().await,
        ServerMessage::TableStart { ok: true, .. }
    ));
    alice.send(json!({"type": "cardtable.finish"})).await;
    alice.recv_until(is_seat_update).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let key = room_state_key("room-z");
    assert!(broker.get(&key).await.unwrap().is_some());

    // when (操作):
    alice.close().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // then (期待する結果):
    assert_eq!(broker.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_lobby_room_snapshot_survives_empty_room() {
    // テスト項目: ロビー状態のルームが空になってもスナップショットは残る（TTL で失効）
    // given (前提条件):
    let broker = InMemorySyncBackend::new();
    let server = TestServer::start(broker.clone()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    alice.join("room-w").await;
    alice.send(json!({"type": "select-game", "game": "bridge"})).await;
    alice.recv_until(is_seat_update).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // when (操作):
    alice.close().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // then (期待する結果):
    assert!(broker.get(&room_state_key("room-w")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_started_room_snapshot_survives_empty_room() {
    // テスト項目: ゲーム中のルームが空になってもスナップショットは残り、別のサーバーで復元できる
    // given (前提条件):
    let broker = InMemorySyncBackend::new();
    let server_a = TestServer::start(broker.clone()).await;
    let mut alice = TestClient::connect(&server_a.url()).await;
    alice.join("room-s").await;
    alice
        .send(json!({"type": "select-game", "game": "custom", "players": 1}))
        .await;
    alice.recv_until(is_seat_update).await;
    alice
        .send(json!({"type": "cardtable.seat.claim", "seatIndex": 0, "playerId": "alice"}))
        .await;
    alice.recv_until(is_seat_update).await;
    alice.send(json!({"type": "cardtable.start"})).await;
    assert!(matches!(
        alice.recv().await,
        ServerMessage::TableStart { ok: true, .. }
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // when (操作):
    alice.close().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // then (期待する結果):
    assert!(broker.get(&room_state_key("room-s")).await.unwrap().is_some());
    let server_b = TestServer::start(broker.clone()).await;
    let mut carol = TestClient::connect(&server_b.url()).await;
    carol.join("room-s").await;
    let ServerMessage::SeatUpdate { table_state } = carol.recv_until(is_seat_update).await else {
        unreachable!();
    };
    assert_eq!(table_state.status, TableStatusDto::Started);
    assert_eq!(table_state.seats[0].player_id.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_unreachable_store_degrades_to_single_process() {
    // テスト項目: 外部ストアに接続できなくても、ヘルスチェックと座席の確保が時間内に完了する
    // given (前提条件): 何も待ち受けていないポートを指す Redis バックエンド
    let backend = RedisSyncBackend::open("redis://127.0.0.1:1").expect("URL should be valid");
    let bound = Duration::from_secs(10);
    let server = tokio::time::timeout(bound, TestServer::start_with(Arc::new(backend)))
        .await
        .expect("Server should start without the store");

    // when (操作):
    let result = tokio::time::timeout(bound, async {
        let health: Value = reqwest::get(format!("http://{}/api/health", server.addr))
            .await
            .expect("Failed to request health check")
            .json()
            .await
            .expect("Health check should return JSON");

        let mut alice = TestClient::connect(&server.url()).await;
        alice.join("room-d").await;
        alice
            .send(json!({"type": "cardtable.seat.claim", "seatIndex": 0, "playerId": "alice"}))
            .await;
        let claimed = alice.recv_until(is_seat_update).await;
        // the next message from the same socket is still routed
        alice.send(json!({"type": "debug"})).await;
        let echoed: Value = serde_json::from_str(&alice.recv_text().await).unwrap();
        (health, claimed, echoed)
    })
    .await;

    // then (期待する結果):
    let (health, claimed, echoed) = result.expect("Signaling should not wait on the store");
    assert_eq!(health, json!({"status": "ok"}));
    let ServerMessage::SeatUpdate { table_state } = claimed else {
        unreachable!();
    };
    assert_eq!(table_state.seats[0].player_id.as_deref(), Some("alice"));
    assert_eq!(echoed, json!({"type": "debug"}));
}

#[tokio::test]
async fn test_targeted_offer_is_relayed_to_target_only() {
    // テスト項目: target 付きの offer は指定したメンバーだけに送信者の ID 付きで届く
    // given (前提条件):
    let server = TestServer::start(InMemorySyncBackend::new()).await;
    let mut alice = TestClient::connect(&server.url()).await;
    let mut bob = TestClient::connect(&server.url()).await;
    let mut carol = TestClient::connect(&server.url()).await;
    let alice_id = alice.join("room-m").await;
    let bob_id = bob.join("room-m").await;
    carol.join("room-m").await;
    bob.recv().await; // peer-joined (carol)

    // when (操作):
    alice
        .send(json!({"type": "offer", "sdp": {"type": "offer", "sdp": "v=0"}, "target": bob_id}))
        .await;

    // then (期待する結果):
    assert_eq!(
        bob.recv().await,
        ServerMessage::Offer {
            sdp: json!({"type": "offer", "sdp": "v=0"}),
            id: alice_id
        }
    );
    // the offer was fully relayed before bob received it, so carol's next message proves none reached her
    carol.send(json!({"type": "select-activity", "activity": "poker"})).await;
    assert_eq!(
        carol.recv().await,
        ServerMessage::ActivitySelected {
            activity: "poker".to_string()
        }
    );
}
