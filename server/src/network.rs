//! TCP accept loop: admits connections and spawns a session for each

use crate::client_manager::{ClientManager, SharedClientManager};
use crate::game::GameState;
use crate::session::run_session;
use log::{error, info};
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

/// Listening server owning the shared client manager.
pub struct Server {
    listener: TcpListener,
    clients: SharedClientManager<OwnedWriteHalf>,
}

impl Server {
    /// Binds the listener. Failure here is fatal to the caller.
    pub async fn bind(
        addr: &str,
        state: GameState,
        rng: StdRng,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            clients: ClientManager::new(state, rng).into_shared(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn clients(&self) -> SharedClientManager<OwnedWriteHalf> {
        Arc::clone(&self.clients)
    }

    /// Accepts connections forever. Accept errors are logged and skipped.
    pub async fn run(self) {
        info!("Waiting for players...");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.admit(stream, addr).await,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        let (reader, writer) = stream.into_split();

        let seat = {
            let mut clients = self.clients.lock().await;
            match clients.admit(writer).await {
                Ok(seat) => seat,
                Err(e) => {
                    info!("Refused connection from {}: {}", addr, e);
                    return;
                }
            }
        };

        info!("Player {} connected from {}", seat.symbol, addr);
        tokio::spawn(run_session(Arc::clone(&self.clients), seat, reader));
    }
}
