//! Gameface signaling client.
//!
//! Joins a room, prints room events and sends typed commands read from stdin.
//! Takes part in peer negotiation with synthetic (media-less) links.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval)
//! and re-sends `join` every time.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gameface-client -- --room lobby --player-id alice
//! cargo run --bin gameface-client -- -r lobby -p bob -u ws://127.0.0.1:3000/ws
//! ```

use clap::Parser;
use gameface_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "gameface-client")]
#[command(about = "Signaling client for Gameface rooms and card tables", long_about = None)]
struct Args {
    /// Room to join
    #[arg(short = 'r', long)]
    room: String,

    /// Player id used when claiming seats
    #[arg(short = 'p', long)]
    player_id: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = gameface_client::run_client(args.url, args.room, args.player_id).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
