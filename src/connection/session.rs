// src/connection/session.rs

//! Defines the state associated with a single client session.

use crate::core::protocol::{FrameScanner, OverflowPolicy};
use crate::core::pubsub::{ConnectionId, Subscriber};
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Holds the state specific to a single client session.
///
/// The session is owned by the task driving the connection. The subscription
/// registry only ever sees the cloneable `Subscriber` handle.
#[derive(Debug)]
pub struct SessionState {
    /// The handle other turns use to write to this connection.
    subscriber: Subscriber,
    /// The channel the client is currently subscribed to, if any.
    channel: Option<String>,
    /// The receive window reassembling frames from the byte stream.
    pub scanner: FrameScanner,
}

impl SessionState {
    /// Creates a session and returns the receiving end of its outbound queue, which
    /// the connection's writer drains.
    pub fn new(
        addr: SocketAddr,
        buffer_size: usize,
        policy: OverflowPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (subscriber, rx) = Subscriber::new(ConnectionId::from(addr));
        let session = Self {
            subscriber,
            channel: None,
            scanner: FrameScanner::new(buffer_size, policy),
        };
        (session, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        self.subscriber.id()
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.subscriber.is_live()
    }

    /// Queues bytes for this connection only.
    pub fn send(&self, payload: Bytes) -> bool {
        self.subscriber.send(payload)
    }

    /// Only the subscription registry records channel changes, so the recorded
    /// channel always matches the registry's membership.
    pub(crate) fn set_channel(&mut self, channel: Option<String>) {
        self.channel = channel;
    }

    /// Marks the session closed and releases its receive window.
    pub(crate) fn release(&mut self) {
        self.subscriber.mark_closed();
        self.scanner.clear();
    }
}
