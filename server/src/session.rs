//! Per-connection command loop

use crate::client_manager::{Flow, Seat, SharedClientManager};
use log::{debug, info, warn};
use shared::Command;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};

/// Longest command line accepted, terminator excluded. Anything longer is
/// answered as an unknown command and the rest of that line is skipped.
pub const MAX_LINE_LENGTH: usize = 256;

/// Splits a client stream into decoded commands.
///
/// Bytes are decoded lossily, so a line that is not valid UTF-8 still
/// reaches the parser instead of ending the session.
struct CommandReader<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
    overflowed: bool,
}

impl<R: AsyncRead + Unpin> CommandReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: Vec::with_capacity(MAX_LINE_LENGTH),
            overflowed: false,
        }
    }

    /// Next command, or `None` once the peer has closed its side.
    async fn next_command(&mut self) -> io::Result<Option<Command>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.line.is_empty() && !self.overflowed {
                    return Ok(None);
                }
                return Ok(Some(self.take_command()));
            }

            let (chunk, consumed, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (&available[..end], end + 1, true),
                None => (available, available.len(), false),
            };
            if !self.overflowed {
                if self.line.len() + chunk.len() > MAX_LINE_LENGTH {
                    self.overflowed = true;
                    self.line.clear();
                } else {
                    self.line.extend_from_slice(chunk);
                }
            }
            self.reader.consume(consumed);

            if complete {
                return Ok(Some(self.take_command()));
            }
        }
    }

    fn take_command(&mut self) -> Command {
        let command = if self.overflowed {
            Command::Unknown
        } else {
            Command::parse(&String::from_utf8_lossy(&self.line))
        };
        self.line.clear();
        self.overflowed = false;
        command
    }
}

/// Serves one admitted client until it quits, disconnects or is removed by
/// the server.
///
/// Lines are decoded outside the lock; each decoded command is then applied
/// with the lock held for its whole validate, mutate and broadcast span.
pub async fn run_session<R, W>(clients: SharedClientManager<W>, seat: Seat, reader: R)
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    {
        let mut clients = clients.lock().await;
        if let Err(e) = clients.welcome(&seat).await {
            warn!("Session for player {} could not start: {}", seat.symbol, e);
            clients.release(&seat).await;
            return;
        }
    }

    let mut commands = CommandReader::new(reader);

    loop {
        let command = tokio::select! {
            _ = seat.evicted.notified() => {
                debug!("Player {} was removed by the server", seat.symbol);
                break;
            }
            command = commands.next_command() => command,
        };

        match command {
            Ok(Some(command)) => {
                let mut clients = clients.lock().await;
                if clients.execute(&seat, command).await == Flow::Stop {
                    break;
                }
            }
            Ok(None) => {
                info!("Player {} closed the connection", seat.symbol);
                break;
            }
            Err(e) => {
                warn!("Read from player {} failed: {}", seat.symbol, e);
                break;
            }
        }
    }

    clients.lock().await.disconnect(&seat).await;
    info!("Player {} disconnected, session terminating", seat.symbol);
}
