//! One task per connected client.

use crate::dispatcher::Dispatcher;
use crate::error::GameError;
use log::{debug, error, info, warn};
use parques_shared::{encode_frame, FrameDecoder, Response};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::timeout;

const READ_BUFFER_SIZE: usize = 4096;

/// Reads requests from one peer and writes back one response per request.
pub struct ClientSession<S> {
    handle: String,
    stream: S,
    decoder: FrameDecoder,
    dispatcher: Dispatcher,
    read_timeout: Duration,
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        handle: impl Into<String>,
        stream: S,
        dispatcher: Dispatcher,
        read_timeout: Duration,
    ) -> Self {
        Self {
            handle: handle.into(),
            stream,
            decoder: FrameDecoder::new(),
            dispatcher,
            read_timeout,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Serves the peer until it hangs up, the socket fails or the server
    /// shuts down. The player is removed from the game afterwards.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) {
        info!("Client connected: {}", self.handle);
        self.dispatcher.register(&self.handle).await;

        match self.serve(&shutdown).await {
            Ok(()) => info!("Client disconnected: {}", self.handle),
            Err(e) => error!("Connection to {} failed: {}", self.handle, e),
        }

        self.dispatcher.disconnect(&self.handle).await;
    }

    async fn serve(&mut self, shutdown: &watch::Receiver<bool>) -> Result<(), GameError> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            if *shutdown.borrow() {
                debug!("Closing session {} for shutdown", self.handle);
                return Ok(());
            }

            // The timeout only exists so the shutdown flag gets rechecked.
            let read = match timeout(self.read_timeout, self.stream.read(&mut buffer)).await {
                Ok(read) => read?,
                Err(_) => continue,
            };
            if read == 0 {
                return Ok(());
            }

            self.decoder.extend(&buffer[..read]);
            self.drain_frames().await?;
        }
    }

    // Answers every complete message currently buffered.
    async fn drain_frames(&mut self) -> Result<(), GameError> {
        loop {
            let response = match self.decoder.next_frame() {
                Ok(None) => return Ok(()),
                Ok(Some(message)) => self.dispatcher.dispatch(&self.handle, &message).await,
                Err(e) => {
                    warn!("Bad frame from {}: {}", self.handle, e);
                    GameError::Protocol(e.to_string()).into()
                }
            };
            self.send(&response).await?;
        }
    }

    async fn send(&mut self, response: &Response) -> Result<(), GameError> {
        let bytes = encode_frame(response).map_err(|e| GameError::Protocol(e.to_string()))?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
