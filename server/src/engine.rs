//! Parqués rules over [`GameState`].
//!
//! The engine is the only code that mutates game state. Callers are
//! expected to hold the server lock around every call.

use crate::error::GameError;
use crate::game::{GameState, Player};
use parques_shared::{
    CaptureInfo, Color, GameSnapshot, Phase, PiecePosition, Winner, BOARD_SIZE, HOME_THRESHOLD,
    MAX_PLAYERS, MIN_PLAYERS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Failed pair attempts allowed per turn while nothing is on the board.
pub const MAX_JAIL_ATTEMPTS: u32 = 3;

/// Source of dice throws.
pub trait DiceRoller: Send {
    /// Throws two six-sided dice.
    fn roll(&mut self) -> (u8, u8);
}

/// Uniform dice backed by a seedable RNG.
#[derive(Debug)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DiceRoller for RandomDice {
    fn roll(&mut self) -> (u8, u8) {
        (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6))
    }
}

/// Replays a fixed sequence of throws, then keeps throwing `(1, 2)`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<(u8, u8)>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }
}

impl DiceRoller for ScriptedDice {
    fn roll(&mut self) -> (u8, u8) {
        self.rolls.pop_front().unwrap_or((1, 2))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub color: Color,
    pub players_count: usize,
    pub can_start: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub turn_order: Vec<String>,
    pub first_player: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    pub dice: (u8, u8),
    pub is_pair: bool,
    /// Exit cell a jailed piece was released to.
    pub released_to: Option<u8>,
    pub extra_turn: bool,
    pub can_move: bool,
    pub turn_ended: bool,
    pub next_player: Option<String>,
}

impl RollOutcome {
    pub fn total(&self) -> u8 {
        self.dice.0 + self.dice.1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub piece_id: u8,
    /// Track index the move landed on, before any conversion to home.
    pub landing: u8,
    pub new_position: PiecePosition,
    pub captured: Option<CaptureInfo>,
    pub winner: Option<Winner>,
    pub next_player: Option<String>,
}

pub struct GameEngine {
    state: GameState,
    dice: Box<dyn DiceRoller>,
}

impl GameEngine {
    pub fn new(dice: Box<dyn DiceRoller>) -> Self {
        Self {
            state: GameState::new(),
            dice,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn players_count(&self) -> usize {
        self.state.players.len()
    }

    pub fn can_start(&self) -> bool {
        self.state.players.len() >= MIN_PLAYERS
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.state.snapshot()
    }

    pub fn join(&mut self, handle: &str, name: &str) -> Result<JoinOutcome, GameError> {
        if self.state.game_started || self.state.players.len() >= MAX_PLAYERS {
            return Err(GameError::Capacity);
        }
        if let Some(player) = self.state.player(handle) {
            return Err(GameError::AlreadyJoined(player.color));
        }

        let color = Color::ALL
            .into_iter()
            .find(|color| self.state.players.iter().all(|p| p.color != *color))
            .ok_or(GameError::Capacity)?;

        self.state.players.push(Player::new(handle, name, color));
        self.state.log.push(format!("{} joined as {}", name, color));

        Ok(JoinOutcome {
            color,
            players_count: self.state.players.len(),
            can_start: self.can_start(),
        })
    }

    /// Rolls for turn order and moves the game out of the lobby.
    ///
    /// Equal sums keep join order.
    pub fn start_game(&mut self) -> Result<StartOutcome, GameError> {
        if self.state.game_started {
            return Err(GameError::AlreadyStarted);
        }
        if !self.can_start() {
            return Err(GameError::NotEnoughPlayers);
        }

        let mut rolls = Vec::with_capacity(self.state.players.len());
        let mut summary = Vec::with_capacity(self.state.players.len());
        for player in &self.state.players {
            let (d1, d2) = self.dice.roll();
            let total = d1 + d2;
            summary.push(format!("{}: {}+{}={}", player.name, d1, d2, total));
            rolls.push((player.id.clone(), total));
        }
        rolls.sort_by(|a, b| b.1.cmp(&a.1));

        let turn_order: Vec<String> = rolls.into_iter().map(|(id, _)| id).collect();
        let first_player = turn_order[0].clone();

        self.state.game_started = true;
        self.state.turn_order = turn_order.clone();
        self.state.current_turn = Some(first_player.clone());
        self.state.dice_attempts = 0;
        self.state.touch();

        self.state
            .log
            .push(format!("Game started. Initial rolls: {}", summary.join(", ")));
        let first_name = self.state.player_name(&first_player);
        self.state.log.push(format!("First turn: {}", first_name));

        Ok(StartOutcome {
            turn_order,
            first_player,
        })
    }

    pub fn roll_dice(&mut self, handle: &str) -> Result<RollOutcome, GameError> {
        let index = self.ensure_turn(handle)?;

        let (d1, d2) = self.dice.roll();
        let is_pair = d1 == d2;
        self.state.touch();

        let name = self.state.players[index].name.clone();
        self.state
            .log
            .push(format!("{} rolled {} and {} (total {})", name, d1, d2, d1 + d2));

        let mut outcome = RollOutcome {
            dice: (d1, d2),
            is_pair,
            released_to: None,
            extra_turn: false,
            can_move: false,
            turn_ended: false,
            next_player: None,
        };

        if is_pair {
            outcome.extra_turn = true;
            outcome.released_to = self.release_from_jail(index);
            if outcome.released_to.is_none() {
                outcome.can_move = self.state.players[index].on_board() > 0;
            }
            return Ok(outcome);
        }

        self.state.dice_attempts += 1;
        if self.state.players[index].on_board() > 0 {
            outcome.can_move = true;
        } else if self.state.dice_attempts >= MAX_JAIL_ATTEMPTS {
            self.state.log.push(format!(
                "{} failed to roll a pair {} times",
                name, MAX_JAIL_ATTEMPTS
            ));
            self.next_turn();
            outcome.turn_ended = true;
            outcome.next_player = self.state.current_turn.clone();
        }

        Ok(outcome)
    }

    pub fn move_piece(
        &mut self,
        handle: &str,
        piece_index: usize,
        steps: u32,
    ) -> Result<MoveOutcome, GameError> {
        let mover = self.ensure_turn(handle)?;

        let piece = self.state.players[mover]
            .pieces
            .get(piece_index)
            .copied()
            .ok_or_else(|| GameError::InvalidPiece(format!("no piece {}", piece_index)))?;
        let from = match piece.position {
            PiecePosition::Jail => {
                return Err(GameError::InvalidPiece(format!(
                    "piece {} is in jail",
                    piece_index
                )))
            }
            PiecePosition::Home => {
                return Err(GameError::InvalidPiece(format!(
                    "piece {} is already home",
                    piece_index
                )))
            }
            PiecePosition::Board(index) => index,
        };

        self.state.touch();
        let landing = ((from as u64 + steps as u64) % BOARD_SIZE as u64) as u8;

        let captured = if self.state.board.kind(landing).is_protected() {
            None
        } else {
            self.capture_at(mover, landing)
        };

        let name = self.state.players[mover].name.clone();
        self.state.players[mover].pieces[piece_index].position = PiecePosition::Board(landing);
        self.state
            .log
            .push(format!("{} moved piece {} to {}", name, piece_index, landing));

        let new_position = if landing >= HOME_THRESHOLD {
            let player = &mut self.state.players[mover];
            player.pieces[piece_index].position = PiecePosition::Home;
            player.finished += 1;
            let finished = player.finished;
            self.state.log.push(format!(
                "{} brought a piece home ({} of 4)",
                name, finished
            ));
            PiecePosition::Home
        } else {
            PiecePosition::Board(landing)
        };

        let mut outcome = MoveOutcome {
            piece_id: piece.id,
            landing,
            new_position,
            captured,
            winner: None,
            next_player: None,
        };

        if let Some(winner) = self.check_winner() {
            self.state.log.push(format!("{} has won the game!", winner.name));
            self.state.winner = Some(winner.clone());
            outcome.winner = Some(winner);
        } else {
            self.next_turn();
            outcome.next_player = self.state.current_turn.clone();
        }

        Ok(outcome)
    }

    /// Passes the turn to the next entry of the turn order, wrapping.
    pub fn next_turn(&mut self) {
        if self.state.turn_order.is_empty() {
            return;
        }

        let next = self
            .state
            .current_turn
            .as_ref()
            .and_then(|current| self.state.turn_order.iter().position(|id| id == current))
            .map(|index| (index + 1) % self.state.turn_order.len())
            .unwrap_or(0);

        let next_id = self.state.turn_order[next].clone();
        let name = self.state.player_name(&next_id);
        self.state.current_turn = Some(next_id);
        self.state.dice_attempts = 0;
        self.state.log.push(format!("Turn of {}", name));
        self.state.touch();
    }

    pub fn check_winner(&self) -> Option<Winner> {
        self.state
            .players
            .iter()
            .find(|player| player.has_finished())
            .map(|player| Winner {
                id: player.id.clone(),
                name: player.name.clone(),
            })
    }

    /// Skips the turn of a player who stopped playing.
    pub fn pass_stalled_turn(&mut self) {
        self.state
            .log
            .push("Inactivity timeout exceeded, passing turn");
        self.next_turn();
    }

    /// Removes a departed player. The turn moves on if it was theirs.
    pub fn leave(&mut self, handle: &str) -> Option<Player> {
        let index = self.state.player_index(handle)?;
        let player = self.state.players.remove(index);

        if let Some(position) = self.state.turn_order.iter().position(|id| id == handle) {
            self.state.turn_order.remove(position);

            if self.state.is_current_turn(handle) {
                self.state.current_turn = if self.state.turn_order.is_empty() {
                    None
                } else {
                    let next = position % self.state.turn_order.len();
                    Some(self.state.turn_order[next].clone())
                };
                self.state.dice_attempts = 0;
                self.state.touch();
            }
        }

        self.state.log.push(format!("{} disconnected", player.name));
        if let Some(current) = self.state.current_turn.clone() {
            if self.state.game_started && self.state.winner.is_none() {
                let name = self.state.player_name(&current);
                self.state.log.push(format!("Turn of {}", name));
            }
        }

        Some(player)
    }

    pub fn chat(&mut self, handle: &str, message: &str) -> Result<(), GameError> {
        let name = self
            .state
            .player(handle)
            .map(|player| player.name.clone())
            .ok_or(GameError::NotJoined)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(GameError::Protocol("chat message is empty".into()));
        }

        self.state.log.push(format!("Chat - {}: {}", name, message));
        Ok(())
    }

    // Checks that `handle` may act now and returns its player index.
    fn ensure_turn(&self, handle: &str) -> Result<usize, GameError> {
        match self.state.phase() {
            Phase::Lobby => return Err(GameError::GameNotStarted),
            Phase::Finished => return Err(GameError::GameOver),
            Phase::Running => {}
        }
        if !self.state.is_current_turn(handle) {
            return Err(GameError::NotYourTurn);
        }
        self.state.player_index(handle).ok_or(GameError::NotJoined)
    }

    fn release_from_jail(&mut self, index: usize) -> Option<u8> {
        let player = &mut self.state.players[index];
        let piece = player
            .pieces
            .iter_mut()
            .find(|piece| piece.position == PiecePosition::Jail)?;

        let exit = player.color.exit_cell();
        piece.position = PiecePosition::Board(exit);
        player.in_jail -= 1;

        let name = player.name.clone();
        self.state
            .log
            .push(format!("{} released a piece to cell {}", name, exit));
        Some(exit)
    }

    // Sends the first opposing piece found on `cell` back to jail.
    fn capture_at(&mut self, mover: usize, cell: u8) -> Option<CaptureInfo> {
        let mover_name = self.state.players[mover].name.clone();

        for (index, player) in self.state.players.iter_mut().enumerate() {
            if index == mover {
                continue;
            }
            if let Some(piece) = player
                .pieces
                .iter_mut()
                .find(|piece| piece.position == PiecePosition::Board(cell))
            {
                piece.position = PiecePosition::Jail;
                player.in_jail += 1;

                let capture = CaptureInfo {
                    player_id: player.id.clone(),
                    piece_id: piece.id,
                };
                let victim = player.name.clone();
                self.state.log.push(format!(
                    "{} captured piece {} of {}",
                    mover_name, capture.piece_id, victim
                ));
                return Some(capture);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parques_shared::CellKind;

    const ANA: &str = "127.0.0.1:5001";
    const BEN: &str = "127.0.0.1:5002";
    const CAL: &str = "127.0.0.1:5003";
    const DEE: &str = "127.0.0.1:5004";

    fn engine(rolls: &[(u8, u8)]) -> GameEngine {
        GameEngine::new(Box::new(ScriptedDice::new(rolls.iter().copied())))
    }

    /// Ana (red) and Ben (blue) joined and started with Ana first.
    fn started_pair(rolls: &[(u8, u8)]) -> GameEngine {
        let mut script = vec![(6, 6), (1, 1)];
        script.extend_from_slice(rolls);
        let mut engine = engine(&script);
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.start_game().unwrap();
        engine
    }

    fn place(engine: &mut GameEngine, handle: &str, piece: usize, cell: u8) {
        let index = engine.state.player_index(handle).unwrap();
        let player = &mut engine.state.players[index];
        if player.pieces[piece].position == PiecePosition::Jail {
            player.in_jail -= 1;
        }
        player.pieces[piece].position = PiecePosition::Board(cell);
    }

    fn assert_accounting(engine: &GameEngine) {
        for player in &engine.state().players {
            assert!(player.pieces_accounted_for(), "{} lost track of a piece", player.name);
        }
    }

    #[test]
    fn test_join_assigns_colors_in_order() {
        let mut engine = engine(&[]);
        let first = engine.join(ANA, "Ana").unwrap();
        assert_eq!(first.color, Color::Red);
        assert_eq!(first.players_count, 1);
        assert!(!first.can_start);

        let second = engine.join(BEN, "Ben").unwrap();
        assert_eq!(second.color, Color::Blue);
        assert!(second.can_start);

        assert_eq!(engine.join(CAL, "Cal").unwrap().color, Color::Yellow);
        assert_eq!(engine.join(DEE, "Dee").unwrap().color, Color::Green);
    }

    #[test]
    fn test_fifth_join_is_rejected() {
        let mut engine = engine(&[]);
        for (i, handle) in [ANA, BEN, CAL, DEE].iter().enumerate() {
            engine.join(handle, &format!("P{}", i)).unwrap();
        }

        assert_eq!(engine.join("10.0.0.1:9", "Eve"), Err(GameError::Capacity));
        assert_eq!(engine.players_count(), 4);
    }

    #[test]
    fn test_join_after_start_is_rejected() {
        let mut engine = started_pair(&[]);
        assert_eq!(engine.join(CAL, "Cal"), Err(GameError::Capacity));
        assert_eq!(engine.players_count(), 2);
    }

    #[test]
    fn test_duplicate_join_is_rejected() {
        let mut engine = engine(&[]);
        engine.join(ANA, "Ana").unwrap();
        assert_eq!(
            engine.join(ANA, "Ana again"),
            Err(GameError::AlreadyJoined(Color::Red))
        );
        assert_eq!(engine.players_count(), 1);
    }

    #[test]
    fn test_departed_color_is_reused() {
        let mut engine = engine(&[]);
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.leave(ANA);

        assert_eq!(engine.join(CAL, "Cal").unwrap().color, Color::Red);
    }

    #[test]
    fn test_start_needs_two_players() {
        let mut engine = engine(&[]);
        assert_eq!(engine.start_game(), Err(GameError::NotEnoughPlayers));
        engine.join(ANA, "Ana").unwrap();
        assert_eq!(engine.start_game(), Err(GameError::NotEnoughPlayers));
        assert_eq!(engine.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_orders_by_descending_roll() {
        let mut engine = engine(&[(1, 2), (6, 5), (3, 3)]);
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.join(CAL, "Cal").unwrap();

        let outcome = engine.start_game().unwrap();
        assert_eq!(outcome.turn_order, vec![BEN, CAL, ANA]);
        assert_eq!(outcome.first_player, BEN);
        assert_eq!(engine.state().current_turn.as_deref(), Some(BEN));
        assert_eq!(engine.state().dice_attempts, 0);
        assert_eq!(engine.phase(), Phase::Running);
    }

    #[test]
    fn test_start_ties_keep_join_order() {
        let mut engine = engine(&[(2, 3), (4, 1), (1, 1)]);
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.join(CAL, "Cal").unwrap();

        let outcome = engine.start_game().unwrap();
        assert_eq!(outcome.turn_order, vec![ANA, BEN, CAL]);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut engine = started_pair(&[]);
        let order = engine.state().turn_order.clone();
        assert_eq!(engine.start_game(), Err(GameError::AlreadyStarted));
        assert_eq!(engine.state().turn_order, order);
    }

    #[test]
    fn test_roll_before_start() {
        let mut engine = engine(&[]);
        engine.join(ANA, "Ana").unwrap();
        assert_eq!(engine.roll_dice(ANA), Err(GameError::GameNotStarted));
    }

    #[test]
    fn test_roll_out_of_turn() {
        let mut engine = started_pair(&[]);
        assert_eq!(engine.roll_dice(BEN), Err(GameError::NotYourTurn));
        assert_eq!(engine.roll_dice("stranger:1"), Err(GameError::NotYourTurn));
    }

    #[test]
    fn test_pair_releases_piece_to_exit() {
        let mut engine = started_pair(&[(3, 3)]);
        let outcome = engine.roll_dice(ANA).unwrap();

        assert!(outcome.is_pair);
        assert!(outcome.extra_turn);
        assert_eq!(outcome.released_to, Some(5));
        assert!(!outcome.turn_ended);

        let ana = engine.state().player(ANA).unwrap();
        assert_eq!(ana.in_jail, 3);
        assert_eq!(ana.pieces[0].position, PiecePosition::Board(5));
        assert_eq!(engine.state().current_turn.as_deref(), Some(ANA));
        assert_eq!(engine.state().dice_attempts, 0);
        assert_accounting(&engine);
    }

    #[test]
    fn test_pair_without_jailed_pieces_only_grants_extra_roll() {
        let mut engine = started_pair(&[(4, 4)]);
        for piece in 0..4 {
            place(&mut engine, ANA, piece, 30 + piece as u8);
        }

        let outcome = engine.roll_dice(ANA).unwrap();
        assert!(outcome.extra_turn);
        assert_eq!(outcome.released_to, None);
        assert!(outcome.can_move);
        assert_eq!(engine.state().player(ANA).unwrap().in_jail, 0);
        assert_eq!(engine.state().dice_attempts, 0);
    }

    #[test]
    fn test_three_failed_attempts_end_turn() {
        let mut engine = started_pair(&[(1, 2), (3, 4), (5, 6)]);

        let first = engine.roll_dice(ANA).unwrap();
        assert!(!first.turn_ended);
        assert!(!first.can_move);
        assert_eq!(engine.state().dice_attempts, 1);

        engine.roll_dice(ANA).unwrap();
        assert_eq!(engine.state().dice_attempts, 2);

        let third = engine.roll_dice(ANA).unwrap();
        assert!(third.turn_ended);
        assert_eq!(third.next_player.as_deref(), Some(BEN));
        assert_eq!(engine.state().current_turn.as_deref(), Some(BEN));
        assert_eq!(engine.state().dice_attempts, 0);
    }

    #[test]
    fn test_roll_with_piece_on_board_allows_move() {
        let mut engine = started_pair(&[(2, 5)]);
        place(&mut engine, ANA, 0, 5);

        let outcome = engine.roll_dice(ANA).unwrap();
        assert!(outcome.can_move);
        assert!(!outcome.turn_ended);
        assert_eq!(outcome.total(), 7);
        assert_eq!(engine.state().current_turn.as_deref(), Some(ANA));
    }

    #[test]
    fn test_release_then_move_scenario() {
        let mut engine = started_pair(&[(3, 3), (2, 5)]);

        let pair = engine.roll_dice(ANA).unwrap();
        assert_eq!(pair.released_to, Some(5));

        let roll = engine.roll_dice(ANA).unwrap();
        assert!(!roll.is_pair);
        assert!(roll.can_move);

        let moved = engine.move_piece(ANA, 0, roll.total() as u32).unwrap();
        assert_eq!(moved.new_position, PiecePosition::Board(12));
        assert_eq!(moved.next_player.as_deref(), Some(BEN));
        assert_accounting(&engine);
    }

    #[test]
    fn test_move_wraps_around_track() {
        let mut engine = started_pair(&[]);
        place(&mut engine, ANA, 0, 88);

        let moved = engine.move_piece(ANA, 0, 10).unwrap();
        assert_eq!(moved.landing, 2);
        assert_eq!(moved.new_position, PiecePosition::Board(2));
    }

    #[test]
    fn test_capture_on_normal_cell() {
        let mut engine = started_pair(&[]);
        place(&mut engine, ANA, 0, 5);
        place(&mut engine, BEN, 2, 13);
        assert_eq!(engine.state().board.kind(13), CellKind::Normal);

        let moved = engine.move_piece(ANA, 0, 8).unwrap();
        let captured = moved.captured.unwrap();
        assert_eq!(captured.player_id, BEN);
        assert_eq!(captured.piece_id, 2);

        let ben = engine.state().player(BEN).unwrap();
        assert_eq!(ben.pieces[2].position, PiecePosition::Jail);
        assert_eq!(ben.in_jail, 4);
        assert_eq!(
            engine.state().player(ANA).unwrap().pieces[0].position,
            PiecePosition::Board(13)
        );
        assert_accounting(&engine);
    }

    #[test]
    fn test_no_capture_on_safe_or_exit_cells() {
        let mut engine = started_pair(&[]);
        place(&mut engine, ANA, 0, 5);
        place(&mut engine, ANA, 1, 10);
        place(&mut engine, BEN, 0, 12);
        place(&mut engine, BEN, 1, 22);

        let moved = engine.move_piece(ANA, 0, 7).unwrap();
        assert!(moved.captured.is_none());

        // Ben's turn now; hand it back to Ana for the exit-cell case.
        engine.next_turn();
        let moved = engine.move_piece(ANA, 1, 12).unwrap();
        assert!(moved.captured.is_none());

        let ben = engine.state().player(BEN).unwrap();
        assert_eq!(ben.pieces[0].position, PiecePosition::Board(12));
        assert_eq!(ben.pieces[1].position, PiecePosition::Board(22));
        assert_eq!(ben.in_jail, 2);
    }

    #[test]
    fn test_own_pieces_are_never_captured() {
        let mut engine = started_pair(&[]);
        place(&mut engine, ANA, 0, 13);
        place(&mut engine, ANA, 1, 5);

        let moved = engine.move_piece(ANA, 1, 8).unwrap();
        assert!(moved.captured.is_none());
        let ana = engine.state().player(ANA).unwrap();
        assert_eq!(ana.pieces[0].position, PiecePosition::Board(13));
        assert_eq!(ana.pieces[1].position, PiecePosition::Board(13));
    }

    #[test]
    fn test_reaching_threshold_sends_piece_home() {
        let mut engine = started_pair(&[]);
        place(&mut engine, ANA, 0, 85);

        let moved = engine.move_piece(ANA, 0, 8).unwrap();
        assert_eq!(moved.landing, 93);
        assert_eq!(moved.new_position, PiecePosition::Home);

        let ana = engine.state().player(ANA).unwrap();
        assert_eq!(ana.finished, 1);
        assert_eq!(ana.pieces[0].position, PiecePosition::Home);
        assert_accounting(&engine);
    }

    #[test]
    fn test_capture_on_home_stretch_then_home() {
        let mut engine = started_pair(&[]);
        place(&mut engine, ANA, 0, 88);
        place(&mut engine, BEN, 0, 93);
        assert_eq!(engine.state().board.kind(93), CellKind::Normal);

        let moved = engine.move_piece(ANA, 0, 5).unwrap();
        assert_eq!(moved.landing, 93);
        assert_eq!(moved.new_position, PiecePosition::Home);
        let captured = moved.captured.unwrap();
        assert_eq!(captured.player_id, BEN);
        assert_eq!(captured.piece_id, 0);

        let ben = engine.state().player(BEN).unwrap();
        assert_eq!(ben.in_jail, 4);
        assert_eq!(ben.pieces[0].position, PiecePosition::Jail);
        assert_eq!(engine.state().player(ANA).unwrap().finished, 1);
        assert_accounting(&engine);
    }

    #[test]
    fn test_invalid_pieces() {
        let mut engine = started_pair(&[]);
        assert!(matches!(
            engine.move_piece(ANA, 0, 3),
            Err(GameError::InvalidPiece(_))
        ));
        assert!(matches!(
            engine.move_piece(ANA, 4, 3),
            Err(GameError::InvalidPiece(_))
        ));

        {
            let index = engine.state.player_index(ANA).unwrap();
            let ana = &mut engine.state.players[index];
            ana.pieces[1].position = PiecePosition::Home;
            ana.in_jail -= 1;
            ana.finished += 1;
        }
        assert!(matches!(
            engine.move_piece(ANA, 1, 3),
            Err(GameError::InvalidPiece(_))
        ));
        assert_eq!(engine.state().current_turn.as_deref(), Some(ANA));
    }

    #[test]
    fn test_move_out_of_turn() {
        let mut engine = started_pair(&[]);
        place(&mut engine, BEN, 0, 51);
        assert_eq!(engine.move_piece(BEN, 0, 3), Err(GameError::NotYourTurn));
    }

    #[test]
    fn test_fourth_piece_home_wins() {
        let mut engine = started_pair(&[]);
        {
            let index = engine.state.player_index(ANA).unwrap();
            let ana = &mut engine.state.players[index];
            for piece in 0..3 {
                ana.pieces[piece].position = PiecePosition::Home;
            }
            ana.pieces[3].position = PiecePosition::Board(90);
            ana.in_jail = 0;
            ana.finished = 3;
        }

        let moved = engine.move_piece(ANA, 3, 4).unwrap();
        let winner = moved.winner.unwrap();
        assert_eq!(winner.id, ANA);
        assert!(moved.next_player.is_none());
        assert_eq!(engine.phase(), Phase::Finished);
        assert_eq!(engine.state().current_turn.as_deref(), Some(ANA));
        assert_eq!(engine.check_winner().unwrap().name, "Ana");

        assert_eq!(engine.roll_dice(ANA), Err(GameError::GameOver));
    }

    #[test]
    fn test_turns_cycle_and_wrap() {
        let mut engine = engine(&[(6, 6), (5, 5), (1, 1)]);
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.join(CAL, "Cal").unwrap();
        engine.start_game().unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(engine.state().current_turn.clone().unwrap());
            engine.next_turn();
        }
        assert_eq!(seen, vec![ANA, BEN, CAL, ANA]);
    }

    #[test]
    fn test_leave_passes_turn_to_next_survivor() {
        let mut engine = engine(&[(6, 6), (5, 5), (1, 1)]);
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.join(CAL, "Cal").unwrap();
        engine.start_game().unwrap();
        engine.next_turn();
        assert_eq!(engine.state().current_turn.as_deref(), Some(BEN));

        let gone = engine.leave(BEN).unwrap();
        assert_eq!(gone.name, "Ben");
        assert_eq!(engine.state().current_turn.as_deref(), Some(CAL));
        assert_eq!(engine.state().turn_order, vec![ANA, CAL]);

        engine.leave(CAL);
        assert_eq!(engine.state().current_turn.as_deref(), Some(ANA));
    }

    #[test]
    fn test_leave_of_last_in_order_wraps() {
        let mut engine = started_pair(&[]);
        engine.next_turn();
        assert_eq!(engine.state().current_turn.as_deref(), Some(BEN));

        engine.leave(BEN);
        assert_eq!(engine.state().current_turn.as_deref(), Some(ANA));
        assert!(engine.leave(BEN).is_none());
    }

    #[test]
    fn test_chat_requires_membership_and_text() {
        let mut engine = engine(&[]);
        assert_eq!(engine.chat(ANA, "hi"), Err(GameError::NotJoined));

        engine.join(ANA, "Ana").unwrap();
        assert!(matches!(engine.chat(ANA, "   "), Err(GameError::Protocol(_))));
        engine.chat(ANA, "hola").unwrap();
        assert!(engine
            .snapshot()
            .game_log
            .last()
            .unwrap()
            .ends_with("Chat - Ana: hola"));
    }

    #[test]
    fn test_piece_accounting_over_random_game() {
        let mut engine = GameEngine::new(Box::new(RandomDice::seeded(7)));
        engine.join(ANA, "Ana").unwrap();
        engine.join(BEN, "Ben").unwrap();
        engine.start_game().unwrap();

        for _ in 0..500 {
            if engine.phase() == Phase::Finished {
                break;
            }
            let current = engine.state().current_turn.clone().unwrap();
            let roll = engine.roll_dice(&current).unwrap();
            if roll.can_move {
                let player = engine.state().player(&current).unwrap();
                let piece = player
                    .pieces
                    .iter()
                    .position(|piece| piece.position.is_on_board())
                    .unwrap();
                engine
                    .move_piece(&current, piece, roll.total() as u32)
                    .unwrap();
            }
            assert_accounting(&engine);
        }
    }
}
