// src/core/pubsub/subscriber.rs

use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Identifies a connection by its remote address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(SocketAddr);

impl From<SocketAddr> for ConnectionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0.ip(), self.0.port())
    }
}

/// A cloneable write handle onto one connection.
///
/// Writes are queued without bound and drained by the connection's writer task, so
/// sending never blocks a turn. A slow reader accumulates backlog.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Bytes>,
    live: Arc<AtomicBool>,
}

impl Subscriber {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Self {
            id,
            tx,
            live: Arc::new(AtomicBool::new(true)),
        };
        (subscriber, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    pub fn mark_closed(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Queues `payload` if the connection is still live. Returns whether it was queued.
    pub fn send(&self, payload: Bytes) -> bool {
        self.is_live() && self.tx.send(payload).is_ok()
    }
}
