use crate::input::{is_quit, InputManager};
use crate::rendering::Renderer;
use log::{debug, error, info};
use std::io::Write;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const BUFFER_SIZE: usize = 1024;

pub struct Client {
    stream: TcpStream,
    server_addr: SocketAddr,
}

impl Client {
    pub async fn connect(host: &str, port: u16) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect((host, port)).await?;
        let server_addr = stream.peer_addr()?;
        info!("Connected to {}", server_addr);

        Ok(Client {
            stream,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Runs until the user quits, stdin closes, or the server hangs up.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = self.stream.into_split();
        let mut receiver = tokio::spawn(receive_messages(reader, Renderer::stdout()));
        let mut input = InputManager::new(tokio::io::stdin());
        let mut console = Renderer::stdout();

        let sender = async {
            loop {
                console.prompt()?;
                let Some(line) = input.next_command().await? else {
                    break;
                };
                if let Err(e) = send_command(&mut writer, &line).await {
                    error!("Command failed to send: {}", e);
                }
                if is_quit(&line) {
                    break;
                }
            }
            console.notice("Exiting client.")?;
            Ok::<(), std::io::Error>(())
        };

        tokio::select! {
            result = &mut receiver => {
                if let Ok(Err(e)) = result {
                    debug!("Receiver stopped: {}", e);
                }
            }
            result = sender => {
                receiver.abort();
                result?;
            }
        }

        Ok(())
    }
}

/// Writes one command followed by a newline.
pub async fn send_command<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Prints everything the server sends until it closes the connection.
pub async fn receive_messages<R, W>(mut reader: R, mut renderer: Renderer<W>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Read from server failed: {}", e);
                break;
            }
        };
        renderer.show(&String::from_utf8_lossy(&buffer[..n]))?;
    }
    renderer.notice("Disconnected from server.")
}
