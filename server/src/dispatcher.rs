//! Maps decoded requests onto engine operations.
//!
//! All game state sits behind a single lock. A dispatch parses the request
//! first, then holds the lock for the engine call and for building the
//! response, and releases it before any socket I/O.

use crate::broadcast::BroadcastCache;
use crate::engine::{DiceRoller, GameEngine};
use crate::error::GameError;
use log::{debug, info, warn};
use parques_shared::{JailMove, Phase, Request, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_PLAYER_NAME: &str = "Player";

/// Everything guarded by the server lock.
pub struct ServerState {
    pub engine: GameEngine,
    pub broadcasts: BroadcastCache,
}

pub type SharedState = Arc<Mutex<ServerState>>;

impl ServerState {
    pub fn new(dice: Box<dyn DiceRoller>, mailbox_capacity: usize) -> Self {
        Self {
            engine: GameEngine::new(dice),
            broadcasts: BroadcastCache::new(mailbox_capacity),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Queues the current state for every connected session.
    pub fn publish_update(&mut self) {
        let mut update = Response::update(self.engine.snapshot());
        update.can_start = Some(self.engine.can_start());
        update.players_count = Some(self.engine.players_count());
        self.broadcasts.publish(update);
    }

    /// Cleans up after a closed connection.
    pub fn disconnect(&mut self, handle: &str) {
        self.broadcasts.unregister(handle);
        if let Some(player) = self.engine.leave(handle) {
            info!("Removed player {} ({})", player.name, handle);
            self.publish_update();
        }
    }

    /// Passes the turn if nobody has acted for longer than `stale_after`.
    pub fn check_inactivity(&mut self, now: Instant, stale_after: Duration) -> bool {
        if self.engine.phase() != Phase::Running || self.engine.state().current_turn.is_none() {
            return false;
        }

        let idle = now.saturating_duration_since(self.engine.state().last_activity);
        if idle <= stale_after {
            return false;
        }

        warn!("No activity for {:?}, skipping the current turn", idle);
        self.engine.pass_stalled_turn();
        self.publish_update();
        true
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    state: SharedState,
}

impl Dispatcher {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub async fn register(&self, handle: &str) {
        self.state.lock().await.broadcasts.register(handle);
    }

    pub async fn disconnect(&self, handle: &str) {
        self.state.lock().await.disconnect(handle);
    }

    /// Runs one request for `handle` and builds its response envelope.
    pub async fn dispatch(&self, handle: &str, message: &Value) -> Response {
        let request = match parse_request(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected message from {}: {}", handle, e);
                return e.into();
            }
        };
        debug!("{} -> {}", handle, request.action());

        let mut state = self.state.lock().await;
        match handle_request(&mut state, handle, request) {
            Ok(response) => response,
            Err(e) => {
                debug!("Request from {} failed: {}", handle, e);
                e.into()
            }
        }
    }
}

/// Validates the `action` field and its payload.
pub fn parse_request(message: &Value) -> Result<Request, GameError> {
    let object = message
        .as_object()
        .ok_or_else(|| GameError::Protocol("message must be a JSON object".into()))?;
    let action = object
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| GameError::Protocol("missing action".into()))?;

    match action {
        "join" => {
            let name = optional_str(object.get("name"), "name")?
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_PLAYER_NAME);
            Ok(Request::Join {
                name: name.to_string(),
            })
        }
        "start_game" => Ok(Request::StartGame),
        "roll_dice" => Ok(Request::RollDice),
        "move_piece" => {
            let piece_id = object
                .get("piece_id")
                .and_then(Value::as_i64)
                .ok_or_else(|| GameError::Protocol("piece_id must be an integer".into()))?;
            let piece_id = u8::try_from(piece_id)
                .map_err(|_| GameError::InvalidPiece(format!("no piece {}", piece_id)))?;
            let steps = object
                .get("steps")
                .and_then(Value::as_u64)
                .and_then(|steps| u32::try_from(steps).ok())
                .ok_or_else(|| {
                    GameError::Protocol("steps must be a non-negative integer".into())
                })?;
            Ok(Request::MovePiece { piece_id, steps })
        }
        "get_state" => Ok(Request::GetState),
        "chat" => {
            let message = optional_str(object.get("message"), "message")?.unwrap_or_default();
            Ok(Request::Chat {
                message: message.to_string(),
            })
        }
        other => Err(GameError::UnknownAction(other.to_string())),
    }
}

fn optional_str<'a>(value: Option<&'a Value>, field: &str) -> Result<Option<&'a str>, GameError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(GameError::Protocol(format!("{} must be a string", field))),
    }
}

/// Applies a parsed request. The caller holds the server lock.
pub fn handle_request(
    state: &mut ServerState,
    handle: &str,
    request: Request,
) -> Result<Response, GameError> {
    match request {
        Request::Join { name } => {
            let outcome = state.engine.join(handle, &name)?;
            let mut response = Response::success().with_message(format!(
                "Player {} added with color {}",
                name, outcome.color
            ));
            response.player_id = Some(handle.to_string());
            response.color = Some(outcome.color);
            response.players_count = Some(outcome.players_count);
            response.can_start = Some(outcome.can_start);

            if outcome.can_start {
                state.publish_update();
            }
            Ok(response)
        }

        Request::StartGame => {
            let outcome = state.engine.start_game()?;
            let first_name = state.engine.state().player_name(&outcome.first_player);
            let mut response = Response::success()
                .with_message(format!("Game started. First turn: {}", first_name))
                .with_game_state(state.engine.snapshot());
            response.turn_order = Some(outcome.turn_order);
            response.first_player = Some(outcome.first_player);

            state.publish_update();
            Ok(response)
        }

        Request::RollDice => {
            let outcome = state.engine.roll_dice(handle)?;
            let mut response = Response::success();
            response.dice1 = Some(outcome.dice.0);
            response.dice2 = Some(outcome.dice.1);
            response.is_pair = Some(outcome.is_pair);
            response.total = Some(outcome.total());
            if outcome.extra_turn {
                response.extra_turn = Some(true);
            }
            if let Some(cell) = outcome.released_to {
                response.jail_move = Some(JailMove {
                    success: true,
                    message: format!("Piece moved to cell {}", cell),
                    position: Some(cell),
                });
            }
            if outcome.can_move {
                response.can_move = Some(true);
            }
            if outcome.turn_ended {
                response.turn_ended = Some(true);
                response.next_player = outcome.next_player;
            }
            Ok(response.with_game_state(state.engine.snapshot()))
        }

        Request::MovePiece { piece_id, steps } => {
            let outcome = state.engine.move_piece(handle, piece_id as usize, steps)?;
            let mut response = Response::success()
                .with_message(format!("Piece moved to position {}", outcome.landing))
                .with_game_state(state.engine.snapshot());
            response.new_position = Some(outcome.new_position);
            response.captured = outcome.captured;

            if let Some(winner) = outcome.winner {
                response.winner = Some(winner);
                response.game_ended = Some(true);
                state.publish_update();
            } else {
                response.next_player = outcome.next_player;
            }
            Ok(response)
        }

        Request::GetState => {
            if let Some(update) = state.broadcasts.take(handle) {
                return Ok(update);
            }
            let mut response = Response::success().with_game_state(state.engine.snapshot());
            response.can_start = Some(state.engine.can_start());
            response.players_count = Some(state.engine.players_count());
            Ok(response)
        }

        Request::Chat { message } => {
            state.engine.chat(handle, &message)?;
            Ok(Response::success()
                .with_message("Message sent")
                .with_game_state(state.engine.snapshot()))
        }
    }
}
