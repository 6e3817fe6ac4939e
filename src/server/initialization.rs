// src/server/initialization.rs

//! Builds the shared state, the optional bridge and the TCP listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::bridge::{Bridge, WebSocketBridge};
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let bridge = config.bridge_port.map(|_| {
        Arc::new(WebSocketBridge::new(
            config.send_own_messages_back,
            config.buffer_size,
        ))
    });
    let forwarder = bridge.clone().map(|b| b as Arc<dyn Bridge>);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!(
        "Noobhub listening on {}:{} (TCP)",
        config.host, config.port
    );

    let connection_permits = Arc::new(Semaphore::new(config.max_clients));
    let state = Arc::new(ServerState::new(config, forwarder));
    info!("Server state initialized.");

    Ok(ServerContext {
        state,
        bridge,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
        connection_permits,
    })
}

fn log_startup_info(config: &Config) {
    info!(
        "Receive window: {} bytes, overflow policy: {:?}.",
        config.buffer_size, config.overflow_policy
    );
    info!(
        "Senders {} their own messages.",
        if config.send_own_messages_back {
            "receive"
        } else {
            "do not receive"
        }
    );
    info!(
        "Lobby directory provisioned with {} lobbies; reaper runs every {}s.",
        config.lobbies.len(),
        config.reaper_interval_secs
    );
    match config.bridge_port {
        Some(port) => info!("WebSocket bridge enabled on port {}.", port),
        None => info!("WebSocket bridge is disabled."),
    }
}
