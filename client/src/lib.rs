//! # Parqués Client Library
//!
//! Terminal client for the Parqués server. It keeps one TCP connection open,
//! sends one JSON request per line and waits for the matching response.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`network::ParquesClient`] wraps the connection. Every request has a
//! timeout, and responses may arrive split across reads or without a
//! trailing newline.
//!
//! ### Input Module (`input`)
//! Parses typed commands such as `move 0 7` into protocol requests.
//!
//! ### Rendering Module (`rendering`)
//! Turns response envelopes and game snapshots into readable text.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use parques_client::network::ParquesClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), parques_client::network::ClientError> {
//!     let mut client = ParquesClient::connect("127.0.0.1:12345").await?;
//!     let joined = client.join("Ana").await?;
//!     println!("{:?}", joined.color);
//!
//!     // Updates queued by the server arrive on the next poll.
//!     let state = client.get_state().await?;
//!     println!("{:?}", state.status);
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
pub mod rendering;

pub use network::{ClientError, ParquesClient, REQUEST_TIMEOUT};
