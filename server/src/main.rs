use clap::Parser;
use log::{error, info};
use parques_server::config::{parse_port, prompt_line, ServerConfig, DEFAULT_HOST};
use parques_server::network::{BoxError, Server};
use parques_shared::DEFAULT_PORT;
use std::io;
use std::time::Duration;
use tokio::sync::watch;

/// Parqués game server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to (asked for when omitted)
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Server port to listen on (asked for when omitted)
    #[clap(short, long)]
    port: Option<u16>,
    /// Seconds between inactivity checks
    #[clap(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    watchdog_period: u64,
    /// Seconds of inactivity before the current turn is skipped
    #[clap(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    stale_after: u64,
    /// Session read timeout in milliseconds
    #[clap(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    read_timeout_ms: u64,
    /// Seed for reproducible dice
    #[clap(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> io::Result<ServerConfig> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();

        let host = match self.host {
            Some(host) => host,
            None => prompt_line(&mut input, &mut output, "Server IP", DEFAULT_HOST)?,
        };
        let port = match self.port {
            Some(port) => port,
            None => {
                let raw = prompt_line(&mut input, &mut output, "Port", &DEFAULT_PORT.to_string())?;
                parse_port(&raw, DEFAULT_PORT)
            }
        };

        Ok(ServerConfig {
            host,
            port,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            watchdog_period: Duration::from_secs(self.watchdog_period),
            stale_after: Duration::from_secs(self.stale_after),
            dice_seed: self.seed,
            ..ServerConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    let dice = config.dice();
    let server = Server::bind(config, dice).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_handle = tokio::spawn(server.run(shutdown_rx));

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut server_handle => {
            log_exit(result);
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    if shutdown_tx.send(true).is_err() {
        error!("Server task already gone");
    }
    log_exit(server_handle.await);
    Ok(())
}

fn log_exit(result: Result<Result<(), BoxError>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task panicked: {}", e),
    }
}
