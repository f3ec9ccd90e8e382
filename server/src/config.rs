//! Runtime settings for the server binary.

use crate::broadcast::DEFAULT_MAILBOX_CAPACITY;
use crate::engine::{DiceRoller, RandomDice};
use log::warn;
use parques_shared::DEFAULT_PORT;
use std::io::{self, BufRead, Write};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Shortest accepted read timeout, watchdog period or stale threshold.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long a session blocks on a read before rechecking for shutdown.
    pub read_timeout: Duration,
    pub watchdog_period: Duration,
    /// Idle time after which the current turn is skipped.
    pub stale_after: Duration,
    pub mailbox_capacity: usize,
    /// Fixed seed for reproducible dice.
    pub dice_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout: Duration::from_secs(1),
            watchdog_period: Duration::from_secs(30),
            stale_after: Duration::from_secs(300),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            dice_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Raises zero durations and capacities to their minimum. A zero
    /// watchdog period cannot drive an interval, and a zero read timeout
    /// would make every session spin.
    pub fn sanitized(mut self) -> Self {
        for (name, value) in [
            ("read timeout", &mut self.read_timeout),
            ("watchdog period", &mut self.watchdog_period),
            ("stale threshold", &mut self.stale_after),
        ] {
            if *value < MIN_INTERVAL {
                warn!("{} of {:?} is too short, using {:?}", name, value, MIN_INTERVAL);
                *value = MIN_INTERVAL;
            }
        }
        self.mailbox_capacity = self.mailbox_capacity.max(1);
        self
    }

    pub fn dice(&self) -> Box<dyn DiceRoller> {
        match self.dice_seed {
            Some(seed) => Box::new(RandomDice::seeded(seed)),
            None => Box::new(RandomDice::from_entropy()),
        }
    }
}

/// Asks for a value, falling back to `default` on an empty answer.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: &str,
) -> io::Result<String> {
    write!(output, "{} [{}]: ", prompt, default)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Parses a port number, using `default` for anything that is not one.
pub fn parse_port(raw: &str, default: u16) -> u16 {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => {
            warn!("Invalid port {:?}, using {}", raw.trim(), default);
            default
        }
    }
}
