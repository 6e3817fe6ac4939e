// src/core/state/core.rs

//! The central shared state and the turn logic every connection runs against it.

use super::stats::StatsState;
use crate::config::Config;
use crate::connection::SessionState;
use crate::core::bridge::Bridge;
use crate::core::commands::{Command, dispatch};
use crate::core::lobby::LobbyDirectory;
use crate::core::metrics;
use crate::core::protocol::{SUBSCRIBE_ACK, wrap_command};
use crate::core::pubsub::{ConnectionId, SubscriptionRegistry, deliver};
use crate::core::RelayError;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The mutable state shared by every connection: channel memberships and the
/// lobby directory. Only reachable through [`ServerState::hub`], so every access is
/// a whole turn under one lock.
#[derive(Debug, Default)]
pub struct Hub {
    pub registry: SubscriptionRegistry,
    pub directory: LobbyDirectory,
}

/// What one turn over one incoming chunk did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TurnReport {
    /// The channel joined by a subscribe frame in this chunk.
    pub subscribed: Option<String>,
    /// Commands that were dispatched and produced a payload.
    pub dispatched: usize,
    /// Connections a payload was queued on, summed over the turn.
    pub delivered: usize,
    /// Frames or commands rejected during the turn, in order.
    pub rejected: Vec<RelayError>,
}

/// The process-wide service object handed to every connection and background task.
pub struct ServerState {
    pub config: Config,
    hub: Mutex<Hub>,
    bridge: Option<Arc<dyn Bridge>>,
    pub stats: StatsState,
}

impl ServerState {
    pub fn new(config: Config, bridge: Option<Arc<dyn Bridge>>) -> Self {
        let directory = LobbyDirectory::new(config.lobbies.clone());
        metrics::LOBBIES.set(directory.len() as f64);
        Self {
            config,
            hub: Mutex::new(Hub {
                registry: SubscriptionRegistry::new(),
                directory,
            }),
            bridge,
            stats: StatsState::new(),
        }
    }

    /// Locks the hub. Never hold the guard across an `.await`.
    pub fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock()
    }

    /// Creates the session for a newly accepted connection.
    pub fn open_session(&self, addr: SocketAddr) -> (SessionState, mpsc::UnboundedReceiver<Bytes>) {
        SessionState::new(addr, self.config.buffer_size, self.config.overflow_policy)
    }

    /// Runs one turn: feeds `chunk` to the session's scanner and processes every
    /// complete frame it yields.
    ///
    /// Returns `FrameOverflow` when the chunk did not fit; the window has then been
    /// discarded and nothing in the chunk ran. All other failures are per-command,
    /// logged, and listed in the report.
    pub fn handle_chunk(
        &self,
        session: &mut SessionState,
        chunk: &[u8],
    ) -> Result<TurnReport, RelayError> {
        if let Err(e) = session.scanner.push(chunk) {
            self.record_rejection(&e);
            return Err(e);
        }

        let mut report = TurnReport::default();
        let mut hub = self.hub.lock();

        if let Some(channel) = session.scanner.take_subscribe() {
            hub.registry.subscribe(session, &channel);
            session.send(Bytes::from_static(SUBSCRIBE_ACK));
            metrics::ACTIVE_CHANNELS.set(hub.registry.channel_count() as f64);
            report.subscribed = Some(channel);
        }

        while let Some(body) = session.scanner.take_command() {
            debug!("Client {} posts json: {}", session.id(), body);
            let command = match Command::parse(&body) {
                Ok(command) => command,
                Err(e) => {
                    // The rest of the window waits for the next chunk.
                    warn!("Client {}: {}. Abandoning this scan pass.", session.id(), e);
                    self.record_rejection(&e);
                    report.rejected.push(e);
                    break;
                }
            };

            match dispatch(&mut hub.directory, &command) {
                Ok(payload) => {
                    self.stats.increment_total_commands();
                    metrics::COMMANDS_PROCESSED_TOTAL.inc();
                    let wrapped = wrap_command(&payload.to_string());
                    report.dispatched += 1;
                    report.delivered +=
                        self.broadcast(&hub, session.channel(), &wrapped, Some(session.id()));
                }
                Err(e) => {
                    warn!("Client {}: command '{}' rejected: {}", session.id(), command.action, e);
                    self.record_rejection(&e);
                    report.rejected.push(e);
                }
            }
        }

        Ok(report)
    }

    /// Delivers a wrapped payload on `channel`: first to the bridge, then to every
    /// live member. `origin` is skipped unless senders receive their own messages.
    fn broadcast(
        &self,
        hub: &Hub,
        channel: Option<&str>,
        payload: &Bytes,
        origin: Option<&ConnectionId>,
    ) -> usize {
        let Some(channel) = channel else {
            debug!("Sender is not subscribed to any channel; payload has no audience.");
            return 0;
        };
        if let Some(bridge) = &self.bridge {
            bridge.forward(channel, payload);
        }
        let skip = if self.config.send_own_messages_back {
            None
        } else {
            origin
        };
        let delivered = deliver(&hub.registry, channel, payload, skip);
        metrics::BROADCASTS_TOTAL.inc();
        delivered
    }

    /// Writes a payload that arrived through the bridge to every live TCP member of
    /// `channel`. The payload is relayed as-is and never dispatched.
    pub fn inject(&self, channel: &str, payload: &Bytes) -> usize {
        let hub = self.hub.lock();
        deliver(&hub.registry, channel, payload, None)
    }

    /// Tears a session down: leaves its channel, marks it closed, releases its window.
    pub fn close_session(&self, session: &mut SessionState) {
        let mut hub = self.hub.lock();
        if let Some(channel) = hub.registry.unsubscribe(session) {
            debug!("{} has been disconnected from channel {}", session.id(), channel);
        }
        metrics::ACTIVE_CHANNELS.set(hub.registry.channel_count() as f64);
        drop(hub);
        session.release();
    }

    /// Closes every abandoned lobby. Returns how many were removed.
    pub fn reap_lobbies(&self) -> usize {
        let mut hub = self.hub.lock();
        let removed = hub.directory.reap();
        metrics::LOBBIES.set(hub.directory.len() as f64);
        if removed > 0 {
            metrics::LOBBIES_REAPED_TOTAL.inc_by(removed as f64);
            info!(
                "Reaper closed {} empty lobbies; {} remain.",
                removed,
                hub.directory.len()
            );
        }
        removed
    }

    fn record_rejection(&self, e: &RelayError) {
        self.stats.increment_total_rejected();
        metrics::REJECTED_TOTAL.with_label_values(&[e.kind()]).inc();
    }
}
