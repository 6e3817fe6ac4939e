// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use super::session::SessionState;
use crate::core::metrics;
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::debug;

/// Owns a connection's session and guarantees it is torn down exactly once, however
/// the connection handler's scope is exited (close, transport error, shutdown, panic).
pub struct ConnectionGuard {
    state: Arc<ServerState>,
    session: SessionState,
}

impl ConnectionGuard {
    pub(crate) fn new(state: Arc<ServerState>, session: SessionState) -> Self {
        metrics::CONNECTED_CLIENTS.inc();
        Self { state, session }
    }

    pub(crate) fn session(&self) -> &SessionState {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }
}

impl Drop for ConnectionGuard {
    /// Removes the connection from its channel, marks it not live and releases its
    /// receive window.
    fn drop(&mut self) {
        debug!(
            "ConnectionGuard dropping, cleaning up resources for connection {}",
            self.session.id()
        );
        self.state.close_session(&mut self.session);
        metrics::CONNECTED_CLIENTS.dec();
    }
}
