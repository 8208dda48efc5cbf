//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::ui::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// Every message addressed to this connection (replies, room broadcasts, relayed
/// signaling) goes through the channel registered in the MessagePusher.
///
/// # Arguments
///
/// * `rx` - Channel receiver for messages addressed to this connection
/// * `sender` - WebSocket sink to send messages to this client
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    // Register the connection; `hello` is queued before any other message
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = state.connect.execute(tx).await;
    tracing::info!("Connection '{}' opened", connection_id);

    // Spawn a task to route frames received from this client
    let router = state.router.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => router.route(connection_id, text.as_str()).await,
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // Spawn a task to push messages addressed to this connection
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.disconnect.execute(connection_id).await;
}
