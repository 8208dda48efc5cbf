//! Signaling client session management.

use std::{io::Write, sync::Arc};

use gameface_shared::{
    protocol::{ClientMessage, ServerMessage},
    time::now_millis,
};
use tokio::sync::mpsc;

use crate::{
    domain::{Command, HELP, parse_command},
    error::ClientError,
    formatter::MessageFormatter,
    mesh::{PeerMeshNegotiator, SyntheticPeerLinkFactory},
    signaling::SignalingClient,
};

/// How a session ended without a connection error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The input was closed (Ctrl+C / Ctrl+D)
    InputClosed,
}

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(player_id: &str) {
    print!("{}> ", player_id);
    std::io::stdout().flush().ok();
}

/// Run one connection: join the room, print events, send typed commands
///
/// `join` is sent right after connecting, so a reconnect resynchronizes the
/// room state from the server.
pub async fn run_client_session(
    url: &str,
    room: &str,
    player_id: &str,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<SessionEnd, ClientError> {
    let client = SignalingClient::connect(url).await?;
    let (_subscription, mut events) = client.events();
    let mut negotiator = PeerMeshNegotiator::new(
        Arc::new(SyntheticPeerLinkFactory::new(player_id)),
        client.sender(),
    );

    client.send(ClientMessage::Join {
        room: room.to_string(),
    })?;
    println!(
        "\nYou are '{}' in room '{}'. Type 'help' for commands. Press Ctrl+C to exit.\n",
        player_id, room
    );

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                show(&event, negotiator.self_id(), player_id);
                if let Err(e) = negotiator.handle(&event).await {
                    tracing::warn!("Negotiation failed: {}", e);
                }
            }
            line = input.recv() => {
                let Some(line) = line else {
                    negotiator.close_all().await;
                    return Ok(SessionEnd::InputClosed);
                };
                run_command(&line, &client, &mut negotiator, player_id).await?;
            }
            _ = client.closed() => {
                negotiator.close_all().await;
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
        }
    }
}

fn show(event: &ServerMessage, self_id: Option<&str>, player_id: &str) {
    if let Some(text) = MessageFormatter::format(event, self_id, now_millis()) {
        print!("{}", text);
        redisplay_prompt(player_id);
    }
}

async fn run_command(
    line: &str,
    client: &SignalingClient,
    negotiator: &mut PeerMeshNegotiator,
    player_id: &str,
) -> Result<(), ClientError> {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            println!("{}", e);
            redisplay_prompt(player_id);
            return Ok(());
        }
    };

    match &command {
        Command::Help => println!("{}", HELP),
        Command::Peers => print!("{}", MessageFormatter::format_peers(&negotiator.peers())),
        Command::Leave => negotiator.close_all().await,
        _ => {}
    }
    if let Some(message) = command.to_message(player_id) {
        client.send(message)?;
    }
    redisplay_prompt(player_id);
    Ok(())
}
