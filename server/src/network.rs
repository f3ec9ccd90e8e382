//! TCP listener accepting player connections.

use crate::config::ServerConfig;
use crate::dispatcher::{Dispatcher, ServerState, SharedState};
use crate::engine::DiceRoller;
use crate::session::ClientSession;
use crate::watchdog::ActivityWatchdog;
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BIND_ATTEMPTS: u32 = 5;
const BIND_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Main server owning the listener and the shared game state.
pub struct Server {
    listener: TcpListener,
    state: SharedState,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener, retrying while the address is still in use.
    pub async fn bind(config: ServerConfig, dice: Box<dyn DiceRoller>) -> Result<Self, BoxError> {
        let config = config.sanitized();
        let listener = bind_with_retry(&config.bind_addr()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            state: ServerState::new(dice, config.mailbox_capacity).shared(),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Accepts connections until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), BoxError> {
        let dispatcher = Dispatcher::new(Arc::clone(&self.state));
        let watchdog = ActivityWatchdog::new(
            Arc::clone(&self.state),
            self.config.watchdog_period,
            self.config.stale_after,
        )
        .spawn(shutdown.clone());

        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let session = ClientSession::new(
                            addr.to_string(),
                            stream,
                            dispatcher.clone(),
                            self.config.read_timeout,
                        );
                        tokio::spawn(session.run(shutdown.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Server shutting down");
        if let Err(e) = watchdog.await {
            error!("Watchdog task panicked: {}", e);
        }
        Ok(())
    }
}

async fn bind_with_retry(addr: &str) -> io::Result<TcpListener> {
    let mut attempt = 1;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempt < BIND_ATTEMPTS => {
                warn!(
                    "Address {} in use (attempt {}/{}), retrying in {:?}",
                    addr, attempt, BIND_ATTEMPTS, BIND_RETRY_DELAY
                );
                tokio::time::sleep(BIND_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedDice;
    use parques_shared::{Color, Response};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    fn local_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            read_timeout: Duration::from_millis(50),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_serves_tcp_clients_until_shutdown() {
        let server = Server::bind(local_config(), Box::new(ScriptedDice::default()))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let state = server.state();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(server.run(rx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let local = stream.local_addr().unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer
            .write_all(b"{\"action\":\"join\",\"name\":\"Ana\"}\n")
            .await
            .unwrap();
        let line = lines.next_line().await.unwrap().unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(response.color, Some(Color::Red));
        assert_eq!(response.player_id, Some(local.to_string()));
        assert_eq!(state.lock().await.engine.players_count(), 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_reports_bad_address() {
        let config = ServerConfig {
            host: "not a host".into(),
            ..local_config()
        };
        assert!(Server::bind(config, Box::new(ScriptedDice::default()))
            .await
            .is_err());
    }
}
