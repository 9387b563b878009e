//! Connected clients and the shared battle state they act on
//!
//! This module owns the single lock-protected value of the server: the
//! [`GameState`] together with the write half of every player's connection,
//! keyed by the same slot index. All of the following run with that lock held:
//! - Admission of a new connection and rollback of a failed session start
//! - Execution of a decoded client command
//! - Broadcast of the snapshot after every committed change
//! - Cleanup when a session ends
//!
//! Broadcast writes to the sockets while the lock is held, so one slow client
//! delays every other player's next action. With a four player cap this is an
//! accepted trade-off.

use crate::game::{ActionError, GameState, JoinError, SlotId};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use shared::{welcome_line, Command, MAX_PLAYERS, NO_FREE_CELL, SERVER_FULL, UNKNOWN_COMMAND};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};

/// The manager as shared between the accept loop and every session.
pub type SharedClientManager<W> = Arc<Mutex<ClientManager<W>>>;

/// A session's claim on a player slot.
///
/// The epoch distinguishes successive occupants of the same slot, so a
/// session that outlives its player can never act on a newcomer.
#[derive(Debug, Clone)]
pub struct Seat {
    pub slot: SlotId,
    pub symbol: char,
    epoch: u64,
    /// Signalled when the server closes this seat's connection on its own
    /// (elimination or a failed broadcast write).
    pub evicted: Arc<Notify>,
}

/// Whether a session should keep reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

struct Connection<W> {
    writer: W,
    epoch: u64,
    evicted: Arc<Notify>,
}

pub struct ClientManager<W> {
    state: GameState,
    connections: [Option<Connection<W>>; MAX_PLAYERS],
    next_epoch: u64,
    rng: StdRng,
}

impl<W> ClientManager<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a manager around an initial board. `rng` drives spawn positions.
    pub fn new(state: GameState, rng: StdRng) -> Self {
        Self {
            state,
            connections: std::array::from_fn(|_| None),
            next_epoch: 1,
            rng,
        }
    }

    pub fn into_shared(self) -> SharedClientManager<W> {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// True while `seat` still owns an active player.
    pub fn is_current(&self, seat: &Seat) -> bool {
        self.state.player(seat.slot).is_some()
            && matches!(&self.connections[seat.slot], Some(conn) if conn.epoch == seat.epoch)
    }

    /// Admits a new connection into the first free slot and broadcasts the
    /// new roster.
    ///
    /// On rejection the client is told why and its connection is closed;
    /// the game state is left as it was.
    pub async fn admit(&mut self, mut writer: W) -> Result<Seat, JoinError> {
        let slot = match self.state.join(&mut self.rng) {
            Ok(slot) => slot,
            Err(e) => {
                let notice = match e {
                    JoinError::Full => SERVER_FULL,
                    _ => NO_FREE_CELL,
                };
                if let Err(write_err) = send_line(&mut writer, notice).await {
                    debug!("Could not deliver rejection notice: {}", write_err);
                }
                if let Err(shutdown_err) = writer.shutdown().await {
                    debug!("Shutdown of refused connection failed: {}", shutdown_err);
                }
                return Err(e);
            }
        };

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        let evicted = Arc::new(Notify::new());
        self.connections[slot] = Some(Connection {
            writer,
            epoch,
            evicted: Arc::clone(&evicted),
        });

        info!(
            "{} of {} players connected",
            self.state.active_count(),
            MAX_PLAYERS
        );
        self.broadcast().await;

        Ok(Seat {
            slot,
            symbol: shared::symbol_for(slot),
            epoch,
            evicted,
        })
    }

    /// Sends the one-time welcome line to a freshly admitted seat.
    pub async fn welcome(&mut self, seat: &Seat) -> io::Result<()> {
        if !self.is_current(seat) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "seat was closed before the session started",
            ));
        }
        self.send_to(seat.slot, &welcome_line(seat.symbol)).await
    }

    /// Undoes an admission whose session could not start. No broadcast.
    pub async fn release(&mut self, seat: &Seat) {
        if self.is_current(seat) {
            self.state.leave(seat.slot);
            self.close(seat.slot).await;
        }
    }

    /// Applies one decoded command on behalf of `seat`.
    ///
    /// Committed changes are broadcast once before returning; rejections are
    /// answered to the sender only.
    pub async fn execute(&mut self, seat: &Seat, command: Command) -> Flow {
        if !self.is_current(seat) {
            return Flow::Stop;
        }
        debug!("Player {} issued {:?}", seat.symbol, command);

        match command {
            Command::Move(direction) => match self.state.move_player(seat.slot, direction) {
                Ok(()) => self.broadcast().await,
                Err(e) => self.reject(seat, e).await,
            },
            Command::Attack => match self.state.attack(seat.slot) {
                Ok(report) => {
                    for slot in &report.eliminated {
                        info!("Player {} was eliminated by {}", shared::symbol_for(*slot), seat.symbol);
                        self.close(*slot).await;
                    }
                    self.broadcast().await;
                }
                Err(e) => self.reject(seat, e).await,
            },
            Command::Quit => {
                self.state.leave(seat.slot);
                self.close(seat.slot).await;
                self.broadcast().await;
                return Flow::Stop;
            }
            Command::Invalid(e) => self.reply(seat, &e.to_string()).await,
            Command::Unknown => self.reply(seat, UNKNOWN_COMMAND).await,
        }

        if self.is_current(seat) {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }

    /// Removes a seat whose session ended without QUIT and broadcasts the
    /// new roster. Does nothing if the seat was already removed.
    pub async fn disconnect(&mut self, seat: &Seat) {
        if !self.is_current(seat) {
            return;
        }
        self.state.leave(seat.slot);
        self.close(seat.slot).await;
        self.broadcast().await;
    }

    /// Sends the current snapshot to every active player.
    ///
    /// A player whose write fails is removed on the spot. The survivors are
    /// not sent a corrected snapshot; they see the updated roster with the
    /// next committed change.
    pub async fn broadcast(&mut self) {
        let snapshot = self.state.to_string();

        for slot in 0..MAX_PLAYERS {
            if self.state.player(slot).is_none() {
                continue;
            }
            let Some(conn) = self.connections[slot].as_mut() else {
                continue;
            };

            let result = send_text(&mut conn.writer, &snapshot).await;
            if let Err(e) = result {
                warn!(
                    "Broadcast to player {} failed, removing player: {}",
                    shared::symbol_for(slot),
                    e
                );
                self.state.leave(slot);
                self.close(slot).await;
            }
        }
    }

    async fn reject(&mut self, seat: &Seat, error: ActionError) {
        self.reply(seat, &error.to_string()).await;
    }

    /// Answers the sender only. A failed write here is left for the
    /// session's read side to notice.
    async fn reply(&mut self, seat: &Seat, line: &str) {
        if let Err(e) = self.send_to(seat.slot, line).await {
            warn!("Reply to player {} failed: {}", seat.symbol, e);
        }
    }

    async fn send_to(&mut self, slot: SlotId, line: &str) -> io::Result<()> {
        match self.connections[slot].as_mut() {
            Some(conn) => send_line(&mut conn.writer, line).await,
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    /// Drops the slot's connection and wakes its session.
    async fn close(&mut self, slot: SlotId) {
        if let Some(mut conn) = self.connections[slot].take() {
            if let Err(e) = conn.writer.shutdown().await {
                debug!("Shutdown of player {} connection failed: {}", shared::symbol_for(slot), e);
            }
            conn.evicted.notify_one();
        }
    }
}

async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

async fn send_text<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}
