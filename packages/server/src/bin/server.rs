//! Gameface signaling server.
//!
//! Serves rooms, WebRTC signaling relay and the card table over WebSocket.
//! Several instances can run behind a load balancer when they share a Redis store.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gameface-server
//! cargo run --bin gameface-server -- --host 0.0.0.0 --port 3000 --store-url redis://127.0.0.1:6379
//! ```

use std::time::Duration;

use clap::Parser;
use gameface_server::{config::ServerConfig, ui::Server};
use gameface_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "gameface-server")]
#[command(about = "WebSocket signaling server for Gameface rooms and card tables", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Redis URL shared by all instances (single instance mode when omitted)
    #[arg(long, env = "REDIS_URL")]
    store_url: Option<String>,

    /// How long a room's persisted state survives, in seconds
    #[arg(long, env = "SIGNALING_ROOM_TTL_SECONDS", default_value = "86400")]
    room_ttl_seconds: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            store_url: args.store_url.filter(|url| !url.is_empty()),
            room_ttl: Duration::from_secs(args.room_ttl_seconds),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    // 1. Parse configuration
    let config = ServerConfig::from(Args::parse());

    // 2. Wire repository, pusher, sync and use cases
    let server = match Server::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Run the server
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
