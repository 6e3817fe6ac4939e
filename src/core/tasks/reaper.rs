// src/core/tasks/reaper.rs

//! A background task that periodically closes abandoned lobbies.

use crate::core::state::ServerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The background task struct for the lobby reaper.
pub struct LobbyReaperTask {
    state: Arc<ServerState>,
    period: Duration,
}

impl LobbyReaperTask {
    pub fn new(state: Arc<ServerState>) -> Self {
        let period = Duration::from_secs(state.config.reaper_interval_secs);
        Self { state, period }
    }

    /// The main run loop for the reaper. Each tick is one sweep over the whole
    /// directory.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Lobby reaper started (every {:?}).", self.period);
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the first sweep happens one period in.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    debug!("Checking lobbies");
                    self.state.reap_lobbies();
                }
                _ = shutdown_rx.recv() => {
                    info!("Lobby reaper shutting down.");
                    return;
                }
            }
        }
    }
}
