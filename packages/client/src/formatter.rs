//! Message formatting utilities for client display.

use gameface_shared::{
    protocol::{ServerMessage, TableStateDto, TableStatusDto},
    time::millis_to_jst_rfc3339,
};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a server message for the terminal
    ///
    /// # Arguments
    ///
    /// * `message` - The received message
    /// * `self_id` - Our own connection id, if known (to mark as "me")
    /// * `received_at` - Unix timestamp when the message arrived (milliseconds)
    ///
    /// # Returns
    ///
    /// A formatted string, or `None` for negotiation traffic that is not shown
    pub fn format(message: &ServerMessage, self_id: Option<&str>, received_at: i64) -> Option<String> {
        let at = millis_to_jst_rfc3339(received_at).unwrap_or_default();
        let who = |id: &str| {
            if self_id == Some(id) {
                format!("{} (me)", id)
            } else {
                id.to_string()
            }
        };

        let text = match message {
            ServerMessage::Hello { payload } => format!("\n{}\n", payload),
            ServerMessage::Welcome { id } => format!("\nJoined as {} at {}\n", id, at),
            ServerMessage::PeerJoined { id } => format!("\n+ {} entered at {}\n", who(id), at),
            ServerMessage::PeerLeft { id } => format!("\n- {} left at {}\n", who(id), at),
            ServerMessage::GameSelected { game } => format!("\nGame: {}\n", game),
            ServerMessage::ActivitySelected { activity } => format!("\nActivity: {}\n", activity),
            ServerMessage::Ready { id } => format!("\n{} is ready\n", who(id)),
            ServerMessage::AllReady => "\nEveryone is ready\n".to_string(),
            ServerMessage::StartGame { game } => format!("\nStarting {}!\n", game),
            ServerMessage::SeatUpdate { table_state } => Self::format_table(table_state),
            ServerMessage::TableStart {
                ok: true,
                table_state,
                ..
            } => format!("\nTable started{}", Self::format_table(table_state)),
            ServerMessage::TableStart {
                ok: false, reason, ..
            } => format!(
                "\nTable could not start: {}\n",
                reason.as_deref().unwrap_or("unknown reason")
            ),
            ServerMessage::Offer { .. }
            | ServerMessage::Answer { .. }
            | ServerMessage::Candidate { .. } => return None,
        };
        Some(text)
    }

    /// Format the card table as one line per seat
    pub fn format_table(table: &TableStateDto) -> String {
        let status = match table.status {
            TableStatusDto::Lobby => "lobby",
            TableStatusDto::Started => "started",
            TableStatusDto::Finished => "finished",
        };
        let mut output = String::new();
        output.push_str("\n============================================================\n");
        output.push_str(&format!(
            "Table {} [{}]\n",
            table.game_id.as_deref().unwrap_or("-"),
            status
        ));
        if table.seats.is_empty() {
            output.push_str("(No seats)\n");
        }
        for seat in &table.seats {
            output.push_str(&format!(
                "  seat {}: {}\n",
                seat.index,
                seat.player_id.as_deref().unwrap_or("(empty)")
            ));
        }
        output.push_str("============================================================\n");
        output
    }

    /// Format the list of negotiated peers
    pub fn format_peers(peers: &[String]) -> String {
        if peers.is_empty() {
            return "\n(No peers)\n".to_string();
        }
        format!("\nPeers: {}\n", peers.join(", "))
    }
}
