use parques_shared::{Color, ErrorKind, Response};

/// Everything that can go wrong while serving a request.
///
/// Rule and protocol errors are reported back to the client as error
/// envelopes; network errors only ever end the session that hit them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("the game is full or has already started")]
    Capacity,
    #[error("at least 2 players are needed to start")]
    NotEnoughPlayers,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("invalid piece: {0}")]
    InvalidPiece(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("the game has not started")]
    GameNotStarted,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("already joined as {0}")]
    AlreadyJoined(Color),
    #[error("join the game first")]
    NotJoined,
    #[error("the game is over")]
    GameOver,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::Protocol(_) => ErrorKind::ProtocolError,
            GameError::UnknownAction(_) => ErrorKind::UnknownAction,
            GameError::Capacity => ErrorKind::CapacityError,
            GameError::NotEnoughPlayers => ErrorKind::NotEnoughPlayers,
            GameError::NotYourTurn => ErrorKind::NotYourTurn,
            GameError::InvalidPiece(_) => ErrorKind::InvalidPiece,
            GameError::Network(_) => ErrorKind::NetworkError,
            GameError::GameNotStarted => ErrorKind::GameNotStarted,
            GameError::AlreadyStarted => ErrorKind::AlreadyStarted,
            GameError::AlreadyJoined(_) => ErrorKind::AlreadyJoined,
            GameError::NotJoined => ErrorKind::NotJoined,
            GameError::GameOver => ErrorKind::GameOver,
        }
    }
}

impl From<std::io::Error> for GameError {
    fn from(e: std::io::Error) -> Self {
        GameError::Network(e.to_string())
    }
}

impl From<GameError> for Response {
    fn from(e: GameError) -> Self {
        Response::error(e.kind(), e.to_string())
    }
}
