use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::BOARD_SIZE;

/// Player colors, in the order they are handed out on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Yellow,
    Green,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Yellow, Color::Green];

    /// Board cell where a piece of this color lands when it leaves jail.
    pub fn exit_cell(self) -> u8 {
        match self {
            Color::Red => 5,
            Color::Green => 22,
            Color::Blue => 51,
            Color::Yellow => 68,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Normal,
    Safe,
    Exit,
}

impl CellKind {
    /// Pieces on safe and exit cells cannot be captured.
    pub fn is_protected(self) -> bool {
        !matches!(self, CellKind::Normal)
    }
}

/// Where a piece currently is.
///
/// On the wire this is `"jail"`, `"home"`, or the board index as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiecePosition {
    Jail,
    Home,
    Board(u8),
}

impl PiecePosition {
    pub fn is_on_board(self) -> bool {
        matches!(self, PiecePosition::Board(_))
    }

    pub fn board_index(self) -> Option<u8> {
        match self {
            PiecePosition::Board(index) => Some(index),
            _ => None,
        }
    }
}

impl fmt::Display for PiecePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PiecePosition::Jail => f.write_str("jail"),
            PiecePosition::Home => f.write_str("home"),
            PiecePosition::Board(index) => write!(f, "{}", index),
        }
    }
}

impl Serialize for PiecePosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PiecePosition::Jail => serializer.serialize_str("jail"),
            PiecePosition::Home => serializer.serialize_str("home"),
            PiecePosition::Board(index) => serializer.serialize_u8(*index),
        }
    }
}

impl<'de> Deserialize<'de> for PiecePosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(u64),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Index(index) if (index as usize) < BOARD_SIZE => {
                Ok(PiecePosition::Board(index as u8))
            }
            Raw::Index(index) => Err(de::Error::custom(format!(
                "board index {} out of range",
                index
            ))),
            Raw::Label(label) => match label.as_str() {
                "jail" => Ok(PiecePosition::Jail),
                "home" => Ok(PiecePosition::Home),
                other => Err(de::Error::unknown_variant(other, &["jail", "home"])),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Running,
    Finished,
}

/// Machine-readable error code attached to error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProtocolError,
    UnknownAction,
    CapacityError,
    NotEnoughPlayers,
    NotYourTurn,
    InvalidPiece,
    NetworkError,
    GameNotStarted,
    AlreadyStarted,
    AlreadyJoined,
    NotJoined,
    GameOver,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Success,
    Error,
    Update,
}

/// Client requests, tagged by their `action` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    Join { name: String },
    StartGame,
    RollDice,
    MovePiece { piece_id: u8, steps: u32 },
    GetState,
    Chat { message: String },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::Join { .. } => "join",
            Request::StartGame => "start_game",
            Request::RollDice => "roll_dice",
            Request::MovePiece { .. } => "move_piece",
            Request::GetState => "get_state",
            Request::Chat { .. } => "chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    pub id: u8,
    pub position: PiecePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub color: Color,
    pub pieces: Vec<PieceSnapshot>,
    pub in_jail: u8,
    pub finished_pieces: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JailMove {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureInfo {
    pub player_id: String,
    pub piece_id: u8,
}

/// Full view of the authoritative game state as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub current_turn: Option<String>,
    pub game_started: bool,
    pub phase: Phase,
    pub turn_order: Vec<String>,
    pub dice_attempts: u32,
    pub board: Vec<CellKind>,
    pub game_log: Vec<String>,
    pub winner: Option<Winner>,
}

impl GameSnapshot {
    pub fn player(&self, id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|player| player.id == id)
    }
}

/// Response envelope. Only the fields relevant to an action are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_player: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pair: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jail_move: Option<JailMove>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_turn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_move: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_ended: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_player: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_position: Option<PiecePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured: Option<CaptureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_ended: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GameSnapshot>,
}

impl Response {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn error(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            code: Some(code),
            ..Self::default()
        }
    }

    pub fn update(snapshot: GameSnapshot) -> Self {
        Self {
            status: Status::Update,
            game_state: Some(snapshot),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_game_state(mut self, snapshot: GameSnapshot) -> Self {
        self.game_state = Some(snapshot);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}
