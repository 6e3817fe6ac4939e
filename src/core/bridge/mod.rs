// src/core/bridge/mod.rs

//! The bridge relays the same wrapped payloads to a second transport whose clients
//! are grouped by the same channel names.
//!
//! The core only talks to a bridge through [`Bridge::forward`]. In the other
//! direction a bridge injects payloads with [`ServerState::inject`], which writes
//! them to the TCP members of a channel without dispatching them.
//!
//! [`ServerState::inject`]: crate::core::state::ServerState::inject

pub mod websocket;

pub use websocket::WebSocketBridge;

use bytes::Bytes;

/// A secondary audience for broadcasts.
pub trait Bridge: Send + Sync {
    /// Delivers a wrapped payload to the bridge-side subscribers of `channel`.
    fn forward(&self, channel: &str, payload: &Bytes);
}
