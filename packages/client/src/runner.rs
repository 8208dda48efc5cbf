//! Client execution logic with reconnection support.

use std::time::Duration;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{domain::should_attempt_reconnect, session::run_client_session};

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Run the signaling client with reconnection logic
///
/// Every reconnect sends `join` again, so the room state is resent by the server.
pub async fn run_client(
    url: String,
    room: String,
    player_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = spawn_readline(player_id.clone());
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting to {} as '{}' (attempt {}/{})",
            url,
            player_id,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&url, &room, &player_id, &mut input).await {
            Ok(end) => {
                tracing::info!("Client session ended: {:?}", end);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if !should_attempt_reconnect(reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(Box::new(e));
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL.as_secs(),
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(RECONNECT_INTERVAL).await;
            }
        }
    }
}

/// Read lines on a blocking thread (rustyline is synchronous)
///
/// The thread outlives reconnects; the receiver is handed from session to session.
fn spawn_readline(player_id: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", player_id);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
