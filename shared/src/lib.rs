//! Wire vocabulary shared by the Parqués server and client.
//!
//! Everything that crosses the socket lives here: request and response
//! envelopes, the game snapshot, board and piece enums, and the framing
//! codec that turns a TCP byte stream into JSON messages.

pub mod framing;
pub mod protocol;

pub use framing::{encode_frame, FrameDecoder, FrameError, MAX_FRAME_LEN};
pub use protocol::{
    CaptureInfo, CellKind, Color, ErrorKind, GameSnapshot, JailMove, Phase, PieceSnapshot,
    PiecePosition, PlayerSnapshot, Request, Response, Status, Winner,
};

pub const BOARD_SIZE: usize = 96;
pub const HOME_THRESHOLD: u8 = 92;
pub const PIECES_PER_PLAYER: usize = 4;
pub const MAX_PLAYERS: usize = 4;
pub const MIN_PLAYERS: usize = 2;
pub const DEFAULT_PORT: u16 = 12345;
/// Number of event log entries carried in a snapshot.
pub const LOG_TAIL: usize = 10;
