//! # Grid Battle Server Library
//!
//! This library provides the authoritative server for a small turn-free
//! battle game played over plain TCP. Up to four players share a 5x5 grid
//! with a handful of obstacles, move one cell at a time, and attack anyone
//! standing next to them. Every committed change is pushed to every player
//! as a full text snapshot.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server holds the only copy of the grid, the obstacle layout and the
//! player table. Clients send text commands and render whatever the server
//! sends back; they never hold state of their own.
//!
//! ### Serialized Mutation
//! A single `tokio::sync::Mutex` guards the game state together with every
//! player's outgoing connection. Each command holds it for its whole
//! validate, mutate and broadcast span, so all clients observe the same
//! total order of state transitions and no snapshot ever mixes two of them.
//!
//! ### Connection Lifecycle
//! - Admission into a free slot, or a polite refusal when all slots are taken
//! - One session task per connection reading newline-terminated commands
//! - Removal on QUIT, elimination, end of stream or a failed write
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Grid, obstacles and players, plus the movement and combat rules. Pure
//! state with no I/O, usable and testable without a runtime.
//!
//! ### Client Manager Module (`client_manager`)
//! The lock-protected value shared by all tasks: game state plus the write
//! half of each player's connection. Executes commands, broadcasts
//! snapshots and performs cleanup.
//!
//! ### Session Module (`session`)
//! The per-connection loop that reads lines, decodes them with
//! `shared::Command::parse` and hands them to the client manager.
//!
//! ### Network Module (`network`)
//! Binds the listener and runs the accept loop, spawning a session for
//! every admitted connection.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use server::game::GameState;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut rng = StdRng::from_entropy();
//!     let state = GameState::new(&mut rng);
//!
//!     let server = Server::bind("0.0.0.0:4000", state, rng).await?;
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Known Limitations
//!
//! Snapshots are written to the sockets while the lock is held, which ties
//! the latency of every mutation to the slowest connected client. When a
//! broadcast write fails, that player is removed immediately but the other
//! players only see the shorter roster with the next committed change.

pub mod client_manager;
pub mod game;
pub mod network;
pub mod session;
