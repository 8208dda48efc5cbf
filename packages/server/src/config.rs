//! サーバーの設定
//!
//! バイナリのコマンドライン引数・環境変数から組み立て、依存関係の構築に渡します。

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{SyncBackend, SyncError},
    infrastructure::sync_backend::{InMemorySyncBackend, RedisSyncBackend},
    usecase::DEFAULT_SNAPSHOT_TTL,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 外部ストアの URL。`None` の場合はプロセス内のブローカーを使う（単一プロセス構成）
    pub store_url: Option<String>,
    /// ルームのスナップショットの TTL
    pub room_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            store_url: None,
            room_ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }
}

impl ServerConfig {
    /// 設定に応じた SyncBackend を作成
    pub fn sync_backend(&self) -> Result<Arc<dyn SyncBackend>, SyncError> {
        match self.store_url.as_deref() {
            Some(url) => {
                tracing::info!("Using Redis store for cross-instance sync");
                Ok(Arc::new(RedisSyncBackend::open(url)?))
            }
            None => {
                tracing::info!("No store URL configured, running as a single instance");
                Ok(Arc::new(InMemorySyncBackend::new()))
            }
        }
    }
}
