//! # Grid Battle Client Library
//!
//! A thin terminal client for the grid battle server. The server is fully
//! authoritative and sends ready-to-print text, so the client keeps no game
//! state: it forwards what the user types and prints what the server says.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Reads command lines from the terminal and recognises QUIT so the client
//! can exit right after sending it.
//!
//! ### Network Module (`network`)
//! Owns the TCP connection. A background task prints every incoming
//! message while the foreground loop sends commands, one per line.
//!
//! ### Rendering Module (`rendering`)
//! Writes server messages, the prompt and status notices to the terminal.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1", 4000).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
pub mod rendering;
