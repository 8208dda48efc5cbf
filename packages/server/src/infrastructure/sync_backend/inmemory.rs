//! インメモリの SyncBackend 実装
//!
//! `clone()` した値同士は同じブローカーを共有します。テストでは 1 つのバックエンドを
//! clone して複数のサーバーに渡すことで、Redis なしでプロセス間同期を再現できます。

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use gameface_shared::time::{Clock, SystemClock};
use tokio::sync::{Mutex, broadcast, mpsc};

use crate::domain::{ChannelMessage, SyncBackend, SyncError};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at_millis: i64,
}

struct Broker {
    channel: broadcast::Sender<ChannelMessage>,
    store: Mutex<HashMap<String, StoredValue>>,
    clock: Arc<dyn Clock>,
}

/// プロセス内ブローカーを使う SyncBackend
#[derive(Clone)]
pub struct InMemorySyncBackend {
    broker: Arc<Broker>,
}

impl InMemorySyncBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// TTL の判定に使う時計を指定して作成
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (channel, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            broker: Arc::new(Broker {
                channel,
                store: Mutex::new(HashMap::new()),
                clock,
            }),
        }
    }
}

impl Default for InMemorySyncBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncBackend for InMemorySyncBackend {
    async fn connect(&self) -> Result<(), SyncError> {
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), SyncError> {
        // 購読者がいない場合の送信失敗は Redis の PUBLISH と同じく成功扱い
        let _ = self.broker.channel.send(ChannelMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> Result<mpsc::UnboundedReceiver<ChannelMessage>, SyncError> {
        let mut source = self.broker.channel.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let pattern = pattern.to_string();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(message) => {
                        if !glob_match(&pattern, &message.channel) {
                            continue;
                        }
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("In-memory subscriber lagged, {} messages skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SyncError> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_millis = self.broker.clock.now_millis().saturating_add(ttl_millis);

        let mut store = self.broker.store.lock().await;
        store.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at_millis,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let now = self.broker.clock.now_millis();
        let mut store = self.broker.store.lock().await;

        match store.get(key) {
            Some(stored) if stored.expires_at_millis > now => Ok(Some(stored.value.clone())),
            Some(_) => {
                store.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<(), SyncError> {
        let mut store = self.broker.store.lock().await;
        store.remove(key);
        Ok(())
    }
}

/// `*` を任意の文字列として扱うパターンマッチ
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(head) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(head) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // `*` を含まないパターン
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(position) => rest = &rest[position + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
