//! # Parqués Server Library
//!
//! This library provides the authoritative server for networked Parqués, the
//! Colombian race board game for two to four players. It owns the canonical
//! game state, validates every player action against the rules, and answers
//! each client request with a JSON response envelope.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! All rule decisions are made here. Clients never move pieces themselves:
//! they ask the server to roll or move, and render whatever state comes back.
//!
//! ### Connection Management
//! Handles the complete lifecycle of a TCP connection:
//! - Accepting the connection and opening an update mailbox for it
//! - Decoding requests and writing one response per request
//! - Removing the player and passing their turn when the peer disconnects
//!
//! ### State Broadcasting
//! The protocol is strictly request/response, so updates every player should
//! see (game start, departures, a win) are queued per session and delivered
//! on that session's next `get_state` poll.
//!
//! ## Architecture Design
//!
//! ### One Task per Client
//! Each connection runs in its own tokio task. Game state lives behind a
//! single `tokio::sync::Mutex`, held only while a request is applied and
//! never across socket I/O, so requests are serialized in arrival order.
//!
//! ### Inactivity Watchdog
//! A background task checks periodically whether the player holding the
//! turn has gone quiet for too long and, if so, passes the turn along.
//!
//! ## Module Organization
//!
//! ### Board Module (`board`)
//! Static 96-cell track layout: exit, safe and normal cells.
//!
//! ### Game Module (`game`)
//! Players, pieces, the bounded event log and the state snapshot.
//!
//! ### Engine Module (`engine`)
//! The rules: joining, turn order, dice, jail releases, movement, captures,
//! reaching home and winning.
//!
//! ### Dispatcher Module (`dispatcher`)
//! Request validation and the mapping from actions to engine operations.
//!
//! ### Session, Watchdog and Network Modules
//! The per-client task, the inactivity check and the TCP listener.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use parques_server::config::ServerConfig;
//! use parques_server::network::Server;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), parques_server::network::BoxError> {
//!     let config = ServerConfig::default();
//!     let dice = config.dice();
//!     let server = Server::bind(config, dice).await?;
//!
//!     // Flip the flag to `true` to stop accepting and close every session.
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     server.run(shutdown_rx).await
//! }
//! ```

pub mod board;
pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod game;
pub mod network;
pub mod session;
pub mod watchdog;

pub use config::ServerConfig;
pub use dispatcher::{Dispatcher, ServerState, SharedState};
pub use engine::{DiceRoller, GameEngine, RandomDice, ScriptedDice};
pub use error::GameError;
pub use network::{BoxError, Server};
