//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use gameface_shared::protocol::ClientMessage;
use thiserror::Error;

/// A command typed at the CLI prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Game { game: String, players: Option<usize> },
    Activity(String),
    Claim(usize),
    Release(usize),
    Start,
    Finish,
    Ready,
    StartGame,
    Leave,
    Peers,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}' (type 'help')")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
game <name> [players]   select a game
activity <name>         select an activity
claim <seat>            claim a seat
release <seat>          release your seat
start                   start the card table
finish                  finish the card table
ready                   mark yourself ready
start-game              announce the selected game
peers                   list negotiated peers
leave                   leave the room
help                    show this help";

/// Parse one input line
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err(CommandError::Unknown(String::new()));
    };
    let args: Vec<&str> = words.collect();

    match (name, args.as_slice()) {
        ("game", [game]) => Ok(Command::Game {
            game: game.to_string(),
            players: None,
        }),
        ("game", [game, players]) => players
            .parse()
            .map(|players| Command::Game {
                game: game.to_string(),
                players: Some(players),
            })
            .map_err(|_| CommandError::Usage("game <name> [players]")),
        ("game", _) => Err(CommandError::Usage("game <name> [players]")),
        ("activity", [activity]) => Ok(Command::Activity(activity.to_string())),
        ("activity", _) => Err(CommandError::Usage("activity <name>")),
        ("claim", [seat]) => seat
            .parse()
            .map(Command::Claim)
            .map_err(|_| CommandError::Usage("claim <seat>")),
        ("claim", _) => Err(CommandError::Usage("claim <seat>")),
        ("release", [seat]) => seat
            .parse()
            .map(Command::Release)
            .map_err(|_| CommandError::Usage("release <seat>")),
        ("release", _) => Err(CommandError::Usage("release <seat>")),
        ("start", []) => Ok(Command::Start),
        ("finish", []) => Ok(Command::Finish),
        ("ready", []) => Ok(Command::Ready),
        ("start-game", []) => Ok(Command::StartGame),
        ("leave", []) => Ok(Command::Leave),
        ("peers", []) => Ok(Command::Peers),
        ("help", _) => Ok(Command::Help),
        (other, _) => Err(CommandError::Unknown(other.to_string())),
    }
}

impl Command {
    /// The message to send for this command (`None` for local-only commands)
    pub fn to_message(&self, player_id: &str) -> Option<ClientMessage> {
        let message = match self {
            Command::Game { game, players } => ClientMessage::SelectGame {
                game: game.clone(),
                players: *players,
            },
            Command::Activity(activity) => ClientMessage::SelectActivity {
                activity: activity.clone(),
            },
            Command::Claim(seat_index) => ClientMessage::SeatClaim {
                seat_index: *seat_index,
                player_id: player_id.to_string(),
                table_id: None,
            },
            Command::Release(seat_index) => ClientMessage::SeatRelease {
                seat_index: *seat_index,
                player_id: player_id.to_string(),
                table_id: None,
            },
            Command::Start => ClientMessage::TableStart { table_state: None },
            Command::Finish => ClientMessage::TableFinish,
            Command::Ready => ClientMessage::Ready,
            Command::StartGame => ClientMessage::StartGame,
            Command::Leave => ClientMessage::Leave,
            Command::Peers | Command::Help => return None,
        };
        Some(message)
    }
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `current_attempt` - The number of reconnection attempts made so far
/// * `max_attempts` - The maximum number of reconnection attempts allowed
///
/// # Returns
///
/// `true` if reconnection should be attempted, `false` otherwise
pub fn should_attempt_reconnect(current_attempt: u32, max_attempts: u32) -> bool {
    current_attempt < max_attempts
}
