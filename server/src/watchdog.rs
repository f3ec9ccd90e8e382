use crate::config::MIN_INTERVAL;
use crate::dispatcher::SharedState;
use log::debug;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Periodically passes the turn of a player who stopped acting.
pub struct ActivityWatchdog {
    state: SharedState,
    period: Duration,
    stale_after: Duration,
}

impl ActivityWatchdog {
    /// `period` is raised to [`MIN_INTERVAL`] if shorter.
    pub fn new(state: SharedState, period: Duration, stale_after: Duration) -> Self {
        Self {
            state,
            period: period.max(MIN_INTERVAL),
            stale_after,
        }
    }

    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut state = self.state.lock().await;
                        state.check_inactivity(Instant::now(), self.stale_after);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Activity watchdog stopped");
        })
    }
}
