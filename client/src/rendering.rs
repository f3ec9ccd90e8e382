//! Plain-text rendering of server responses.

use parques_shared::{GameSnapshot, PiecePosition, Response, Status};
use std::fmt::Write;

/// Printed above `update` responses, which were queued when published.
pub const QUEUED_UPDATE_NOTE: &str = "Queued update from server (may be older than the current state)";

pub fn render_response(response: &Response) -> String {
    let mut out = String::new();

    match response.status {
        Status::Error => {
            let code = response
                .code
                .and_then(|code| serde_json::to_value(code).ok())
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_else(|| "error".to_string());
            let _ = writeln!(
                out,
                "Error ({}): {}",
                code,
                response.message.as_deref().unwrap_or("")
            );
            return out;
        }
        Status::Update => {
            let _ = writeln!(out, "{}", QUEUED_UPDATE_NOTE);
        }
        Status::Success => {}
    }

    if let Some(message) = &response.message {
        let _ = writeln!(out, "{}", message);
    }
    if let (Some(d1), Some(d2)) = (response.dice1, response.dice2) {
        let pair = if response.is_pair == Some(true) { " (pair!)" } else { "" };
        let _ = writeln!(out, "Dice: {} + {} = {}{}", d1, d2, d1 + d2, pair);
    }
    if let Some(jail) = &response.jail_move {
        let _ = writeln!(out, "{}", jail.message);
    }
    if response.extra_turn == Some(true) {
        out.push_str("Roll again.\n");
    }
    if response.can_move == Some(true) {
        out.push_str("You can move a piece.\n");
    }
    if let Some(captured) = &response.captured {
        let _ = writeln!(
            out,
            "Captured piece {} of {}",
            captured.piece_id, captured.player_id
        );
    }
    if let Some(winner) = &response.winner {
        let _ = writeln!(out, "{} wins the game!", winner.name);
    }
    if let Some(next) = &response.next_player {
        let _ = writeln!(out, "Next turn: {}", next);
    }
    if let Some(state) = &response.game_state {
        out.push_str(&render_snapshot(state));
    }

    out
}

pub fn render_snapshot(state: &GameSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "-- {:?} --", state.phase);

    for player in &state.players {
        let marker = if state.current_turn.as_deref() == Some(player.id.as_str()) {
            ">"
        } else {
            " "
        };
        let pieces: Vec<String> = player
            .pieces
            .iter()
            .map(|piece| match piece.position {
                PiecePosition::Jail => "jail".to_string(),
                PiecePosition::Home => "home".to_string(),
                PiecePosition::Board(cell) => cell.to_string(),
            })
            .collect();
        let _ = writeln!(
            out,
            "{} {:<12} {:<6} [{}] home {}/4",
            marker,
            player.name,
            player.color,
            pieces.join(", "),
            player.finished_pieces
        );
    }

    if !state.game_log.is_empty() {
        out.push_str("Recent events:\n");
        for entry in &state.game_log {
            let _ = writeln!(out, "  {}", entry);
        }
    }
    out
}
