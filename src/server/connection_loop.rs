// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::ConnectionHandler;
use crate::core::metrics;
use anyhow::{Context, Result};
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// The main server loop that accepts connections and handles graceful shutdown.
pub async fn run(mut ctx: ServerContext) -> Result<()> {
    let mut client_tasks = JoinSet::new();

    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => {
                let (socket, addr) = match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                    warn!(
                        "Rejecting connection from {}: max_clients ({}) reached.",
                        addr, ctx.state.config.max_clients
                    );
                    continue;
                };

                debug!("Accepted new connection from: {}", addr);
                ctx.state.stats.increment_total_connections();
                metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                if let Err(e) = configure_socket(&socket, ctx.state.config.keepalive_secs) {
                    warn!("Failed to set socket options for {}: {}", addr, e);
                }

                let state_clone = ctx.state.clone();
                let shutdown_rx = ctx.shutdown_tx.subscribe();
                client_tasks.spawn(async move {
                    let handler = ConnectionHandler::new(socket, addr, state_clone, shutdown_rx);
                    if let Err(e) = handler.run().await {
                        warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                    }
                    drop(permit);
                });
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!(
        "Shutting down after {} connections and {} commands. Sending signal to all tasks.",
        ctx.state.stats.get_total_connections(),
        ctx.state.stats.get_total_commands()
    );
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No task was listening for the shutdown signal.");
    }

    if tokio::time::timeout(Duration::from_secs(5), async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client connections; aborting the rest.");
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
    Ok(())
}

/// Disables Nagle's algorithm and enables TCP keepalive probing after
/// `keepalive_secs` of idleness.
fn configure_socket(socket: &TcpStream, keepalive_secs: u64) -> std::io::Result<()> {
    socket.set_nodelay(true)?;
    if keepalive_secs > 0 {
        let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(keepalive_secs));
        SockRef::from(socket).set_tcp_keepalive(&keepalive)?;
    }
    Ok(())
}
