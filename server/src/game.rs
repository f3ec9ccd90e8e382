use crate::board::Board;
use log::info;
use parques_shared::{
    Color, GameSnapshot, Phase, PieceSnapshot, PiecePosition, PlayerSnapshot, Winner, LOG_TAIL,
    PIECES_PER_PLAYER,
};
use std::collections::VecDeque;
use std::time::Instant;

pub const LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub id: u8,
    pub position: PiecePosition,
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Connection handle (`ip:port` of the peer).
    pub id: String,
    pub name: String,
    pub color: Color,
    pub pieces: [Piece; PIECES_PER_PLAYER],
    pub in_jail: u8,
    pub finished: u8,
}

impl Player {
    /// Creates a player with every piece in jail.
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: Color) -> Self {
        let mut pieces = [Piece {
            id: 0,
            position: PiecePosition::Jail,
        }; PIECES_PER_PLAYER];
        for (index, piece) in pieces.iter_mut().enumerate() {
            piece.id = index as u8;
        }

        Self {
            id: id.into(),
            name: name.into(),
            color,
            pieces,
            in_jail: PIECES_PER_PLAYER as u8,
            finished: 0,
        }
    }

    pub fn on_board(&self) -> usize {
        self.pieces
            .iter()
            .filter(|piece| piece.position.is_on_board())
            .count()
    }

    pub fn has_finished(&self) -> bool {
        self.finished as usize >= PIECES_PER_PLAYER
    }

    /// `in_jail + on_board + finished` must always cover every piece.
    pub fn pieces_accounted_for(&self) -> bool {
        let jailed = self
            .pieces
            .iter()
            .filter(|piece| piece.position == PiecePosition::Jail)
            .count();
        let home = self
            .pieces
            .iter()
            .filter(|piece| piece.position == PiecePosition::Home)
            .count();

        jailed == self.in_jail as usize
            && home == self.finished as usize
            && self.in_jail as usize + self.on_board() + self.finished as usize == PIECES_PER_PLAYER
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color,
            pieces: self
                .pieces
                .iter()
                .map(|piece| PieceSnapshot {
                    id: piece.id,
                    position: piece.position,
                })
                .collect(),
            in_jail: self.in_jail,
            finished_pieces: self.finished,
        }
    }
}

/// Bounded, append-only game event log.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a timestamped entry, evicting the oldest one when full.
    pub fn push(&mut self, message: impl AsRef<str>) {
        let entry = format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            message.as_ref()
        );
        info!("{}", entry);

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent `count` entries, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

/// The authoritative game model. Rules live in [`crate::engine::GameEngine`].
#[derive(Debug, Clone)]
pub struct GameState {
    /// Players in join order.
    pub players: Vec<Player>,
    pub board: Board,
    pub turn_order: Vec<String>,
    pub current_turn: Option<String>,
    pub dice_attempts: u32,
    pub game_started: bool,
    pub winner: Option<Winner>,
    pub last_activity: Instant,
    pub log: EventLog,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            board: Board::new(),
            turn_order: Vec::new(),
            current_turn: None,
            dice_attempts: 0,
            game_started: false,
            winner: None,
            last_activity: Instant::now(),
            log: EventLog::new(LOG_CAPACITY),
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.game_started, &self.winner) {
            (false, _) => Phase::Lobby,
            (true, None) => Phase::Running,
            (true, Some(_)) => Phase::Finished,
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn player_index(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|player| player.id == id)
    }

    pub fn player_name(&self, id: &str) -> String {
        self.player(id)
            .map(|player| player.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn is_current_turn(&self, id: &str) -> bool {
        self.current_turn.as_deref() == Some(id)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self.players.iter().map(Player::snapshot).collect(),
            current_turn: self.current_turn.clone(),
            game_started: self.game_started,
            phase: self.phase(),
            turn_order: self.turn_order.clone(),
            dice_attempts: self.dice_attempts,
            board: self.board.cells().to_vec(),
            game_log: self.log.tail(LOG_TAIL),
            winner: self.winner.clone(),
        }
    }
}
