use log::debug;
use parques_shared::{encode_frame, FrameDecoder, FrameError, Request, Response};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// How long to wait for the server before giving up on a request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad frame from server: {0}")]
    Frame(#[from] FrameError),
    #[error("server closed the connection")]
    Closed,
    #[error("no response from server within {0:?}")]
    Timeout(Duration),
}

/// A connection to a Parqués server. Each request waits for its response.
pub struct ParquesClient {
    stream: TcpStream,
    decoder: FrameDecoder,
    timeout: Duration,
}

impl ParquesClient {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = timeout(REQUEST_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout(REQUEST_TIMEOUT))??;
        debug!("Connected to {} from {}", addr, stream.local_addr()?);

        Ok(ParquesClient {
            stream,
            decoder: FrameDecoder::new(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Our side of the connection, which the server uses as the player id.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        let bytes = encode_frame(request)?;
        self.send_raw(&bytes).await?;
        self.read_response().await
    }

    /// Writes bytes exactly as given, with no framing added.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn read_response(&mut self) -> Result<Response, ClientError> {
        let limit = self.timeout;
        timeout(limit, self.next_response())
            .await
            .map_err(|_| ClientError::Timeout(limit))?
    }

    async fn next_response(&mut self) -> Result<Response, ClientError> {
        let mut buffer = [0u8; 4096];
        loop {
            if let Some(value) = self.decoder.next_frame()? {
                return Ok(serde_json::from_value(value)?);
            }

            let read = self.stream.read(&mut buffer).await?;
            if read == 0 {
                return Err(ClientError::Closed);
            }
            self.decoder.extend(&buffer[..read]);
        }
    }

    pub async fn join(&mut self, name: &str) -> Result<Response, ClientError> {
        self.request(&Request::Join {
            name: name.to_string(),
        })
        .await
    }

    pub async fn start_game(&mut self) -> Result<Response, ClientError> {
        self.request(&Request::StartGame).await
    }

    pub async fn roll_dice(&mut self) -> Result<Response, ClientError> {
        self.request(&Request::RollDice).await
    }

    pub async fn move_piece(&mut self, piece_id: u8, steps: u32) -> Result<Response, ClientError> {
        self.request(&Request::MovePiece { piece_id, steps }).await
    }

    pub async fn get_state(&mut self) -> Result<Response, ClientError> {
        self.request(&Request::GetState).await
    }

    pub async fn chat(&mut self, message: &str) -> Result<Response, ClientError> {
        self.request(&Request::Chat {
            message: message.to_string(),
        })
        .await
    }
}
