//! Redis を使った SyncBackend 実装
//!
//! ## 接続のライフサイクル
//!
//! - `open` は URL の検証だけを行い、ネットワークには触れない
//! - コマンド用の接続（`ConnectionManager`）は最初の利用時に確立する。並行して
//!   呼ばれても確立処理は 1 回だけで、他の呼び出し側はその完了を待つ
//! - 確立の試行回数と、接続・応答の待ち時間には上限がある
//! - 確立に失敗した場合は何も保持しない。`RETRY_BACKOFF` の間は再試行せずに
//!   すぐ失敗を返し、その後の呼び出しで再試行する
//! - 確立後の切断からの復帰は `ConnectionManager` が自動で行う
//! - pub/sub は購読ごとに専用の接続を張る

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{
    AsyncCommands,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::{
    sync::{Mutex, OnceCell, mpsc},
    time::Instant,
};

use crate::domain::{ChannelMessage, SyncBackend, SyncError};

const CONNECT_RETRIES: usize = 2;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(1);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);
/// 接続に失敗してから次に接続を試みるまでの間隔
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

pub struct RedisSyncBackend {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    retry_after: Mutex<Option<Instant>>,
}

impl RedisSyncBackend {
    /// URL（例: `redis://127.0.0.1:6379`）からバックエンドを作成
    pub fn open(url: &str) -> Result<Self, SyncError> {
        let client = redis::Client::open(url).map_err(|e| SyncError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            retry_after: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, SyncError> {
        if let Some(connection) = self.connection.get() {
            return Ok(connection.clone());
        }
        self.check_backoff().await?;

        let result = self
            .connection
            .get_or_try_init(|| async {
                tracing::info!("Connecting to Redis");
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(CONNECT_RETRIES)
                    .set_connection_timeout(CONNECTION_TIMEOUT)
                    .set_response_timeout(RESPONSE_TIMEOUT);
                self.client
                    .get_connection_manager_with_config(config)
                    .await
                    .map_err(|e| SyncError::Connect(e.to_string()))
            })
            .await
            .cloned();

        if result.is_err() {
            *self.retry_after.lock().await = Some(Instant::now() + RETRY_BACKOFF);
        }
        result
    }

    async fn check_backoff(&self) -> Result<(), SyncError> {
        match *self.retry_after.lock().await {
            Some(at) if Instant::now() < at => Err(SyncError::Connect(
                "Redis unavailable, waiting before the next attempt".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SyncBackend for RedisSyncBackend {
    async fn connect(&self) -> Result<(), SyncError> {
        self.connection().await.map(|_| ())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), SyncError> {
        let mut connection = self.connection().await?;
        connection
            .publish::<_, _, ()>(channel, payload)
            .await
            .map_err(|e| SyncError::Publish {
                channel: channel.to_string(),
                reason: e.to_string(),
            })
    }

    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> Result<mpsc::UnboundedReceiver<ChannelMessage>, SyncError> {
        let subscribe_error = |e: redis::RedisError| SyncError::Subscribe {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        };

        let mut pubsub = tokio::time::timeout(CONNECTION_TIMEOUT, self.client.get_async_pubsub())
            .await
            .map_err(|_| SyncError::Subscribe {
                pattern: pattern.to_string(),
                reason: "connection timed out".to_string(),
            })?
            .map_err(subscribe_error)?;
        pubsub.psubscribe(pattern).await.map_err(subscribe_error)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let pattern = pattern.to_string();
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                let payload = match message.get_payload::<String>() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!("Dropping non-text pub/sub payload: {}", e);
                        continue;
                    }
                };
                let forwarded = ChannelMessage {
                    channel: message.get_channel_name().to_string(),
                    payload,
                };
                if tx.send(forwarded).is_err() {
                    break;
                }
            }
            tracing::warn!("Redis subscription to '{}' ended", pattern);
        });

        Ok(rx)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SyncError> {
        let mut connection = self.connection().await?;
        connection
            .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| store_error(key, e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let mut connection = self.connection().await?;
        connection
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| store_error(key, e))
    }

    async fn del(&self, key: &str) -> Result<(), SyncError> {
        let mut connection = self.connection().await?;
        connection
            .del::<_, ()>(key)
            .await
            .map_err(|e| store_error(key, e))
    }
}

fn store_error(key: &str, error: redis::RedisError) -> SyncError {
    SyncError::Store {
        key: key.to_string(),
        reason: error.to_string(),
    }
}
