//! Typed signaling client.
//!
//! Sends `ClientMessage`s over a WebSocket and fans every received `ServerMessage`
//! out to all registered handlers. `subscribe` returns a `Subscription`; calling
//! `unsubscribe` on it (or dropping it) removes that handler and no other.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use futures_util::{SinkExt, StreamExt};
use gameface_shared::protocol::{ClientMessage, ServerMessage};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::error::ClientError;

type Handler = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// Registered message handlers
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a handler
    pub fn subscribe<F>(self: &Arc<Self>, handler: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, Arc::new(handler));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Call every handler with the message, in registration order
    ///
    /// Handlers run outside the lock, so a handler may subscribe or unsubscribe.
    pub fn dispatch(&self, message: &ServerMessage) {
        let handlers: Vec<Handler> = self.lock().values().cloned().collect();
        for handler in handlers {
            handler(message);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Handler>> {
        // handlers never run under the lock
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle of a registered handler
pub struct Subscription {
    id: u64,
    registry: Weak<HandlerRegistry>,
}

impl Subscription {
    /// Remove the handler
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// WebSocket signaling connection
pub struct SignalingClient {
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    registry: Arc<HandlerRegistry>,
    closed: watch::Receiver<bool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SignalingClient {
    /// Connect to the signaling server
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        tracing::info!("Connected to signaling server at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let registry = HandlerRegistry::new();
        let (closed_tx, closed) = watch::channel(false);

        // Outgoing messages are serialized by a single writer task
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("Failed to serialize '{}': {}", message.kind(), e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    tracing::warn!("Failed to send message: {}", e);
                    break;
                }
            }
        });

        let reader_registry = registry.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(message) => reader_registry.dispatch(&message),
                            Err(_) => tracing::debug!("Ignoring unknown frame: {}", text.as_str()),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            let _ = closed_tx.send(true);
        });

        Ok(Self {
            outgoing,
            registry,
            closed,
            reader,
            writer,
        })
    }

    /// Queue a message for sending
    pub fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        self.outgoing.send(message).map_err(|_| ClientError::Closed)
    }

    /// Sender usable from other tasks (e.g. the peer mesh negotiator)
    pub fn sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outgoing.clone()
    }

    /// Register a handler called with every received server message
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.registry.subscribe(handler)
    }

    /// Receive server messages through a channel instead of a callback
    pub fn events(&self) -> (Subscription, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |message| {
            let _ = tx.send(message.clone());
        });
        (subscription, rx)
    }

    /// Wait until the server side of the connection is gone
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
