//! SyncBackend の実装
//!
//! - `redis`: Redis の pub/sub と `SET EX` を使う本番用の実装
//! - `inmemory`: プロセス内のブローカー。単一プロセス構成と、複数サーバーを
//!   1 プロセス内で動かすテストで使う

pub mod inmemory;
pub mod redis;

pub use self::inmemory::InMemorySyncBackend;
pub use self::redis::RedisSyncBackend;
