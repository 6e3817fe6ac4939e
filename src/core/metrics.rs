// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Server-wide Gauges ---
    /// The number of clients currently connected over TCP.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("noobhub_connected_clients", "Number of currently connected TCP clients.").unwrap();
    /// The number of channels with at least one TCP subscriber.
    pub static ref ACTIVE_CHANNELS: Gauge =
        register_gauge!("noobhub_active_channels", "Number of channels with at least one subscriber.").unwrap();
    /// The number of lobbies in the directory.
    pub static ref LOBBIES: Gauge =
        register_gauge!("noobhub_lobbies", "Number of lobbies in the directory.").unwrap();
    /// The number of clients connected through the WebSocket bridge.
    pub static ref BRIDGE_CLIENTS: Gauge =
        register_gauge!("noobhub_bridge_clients", "Number of currently connected bridge clients.").unwrap();

    // --- Server-wide Counters ---
    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("noobhub_connections_received_total", "Total number of connections received.").unwrap();
    /// The total number of commands dispatched since startup.
    pub static ref COMMANDS_PROCESSED_TOTAL: Counter =
        register_counter!("noobhub_commands_processed_total", "Total number of commands dispatched.").unwrap();
    /// The total number of channel broadcasts.
    pub static ref BROADCASTS_TOTAL: Counter =
        register_counter!("noobhub_broadcasts_total", "Total number of channel broadcasts.").unwrap();
    /// The total number of lobbies closed by the reaper.
    pub static ref LOBBIES_REAPED_TOTAL: Counter =
        register_counter!("noobhub_lobbies_reaped_total", "Total number of empty lobbies closed by the reaper.").unwrap();
    /// Rejected frames and commands, labeled by error kind.
    pub static ref REJECTED_TOTAL: CounterVec =
        register_counter_vec!("noobhub_rejected_total", "Total number of rejected frames and commands, labeled by kind.", &["kind"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
