// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::guard::ConnectionGuard;
use crate::core::RelayError;
use crate::core::protocol::OverflowPolicy;
use crate::core::state::ServerState;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

/// How long teardown waits for queued payloads to reach the peer.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Manages the full lifecycle of a client connection.
///
/// The read half feeds raw chunks into the relay one turn at a time. The write half
/// is owned by a separate task draining the session's outbound queue, so a turn
/// never waits on a slow peer.
pub struct ConnectionHandler<S> {
    stream: S,
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        state: Arc<ServerState>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            stream,
            addr,
            state,
            shutdown_rx,
        }
    }

    /// The main event loop for the connection. Returns once the peer closes, the
    /// transport fails, the overflow policy disconnects, or the server shuts down.
    pub async fn run(self) -> Result<(), RelayError> {
        let Self {
            stream,
            addr,
            state,
            mut shutdown_rx,
        } = self;

        let (session, mut outbound_rx) = state.open_session(addr);
        let mut guard = ConnectionGuard::new(state.clone(), session);
        info!("New client: {}", guard.session().id());

        let (reader, writer) = tokio::io::split(stream);
        let mut chunks = FramedRead::new(reader, BytesCodec::new());
        let mut sink = FramedWrite::new(writer, BytesCodec::new());

        let mut writer_task = tokio::spawn(async move {
            while let Some(payload) = outbound_rx.recv().await {
                if let Err(e) = sink.send(payload).await {
                    debug!("Write to {} failed: {}", addr, e);
                    break;
                }
            }
        });

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Connection handler for {} received shutdown signal.", addr);
                    break Ok(());
                }
                chunk = chunks.next() => match chunk {
                    Some(Ok(bytes)) => {
                        match state.handle_chunk(guard.session_mut(), &bytes) {
                            Ok(report) => trace!("Client {}: {:?}", addr, report),
                            Err(RelayError::FrameOverflow { .. })
                                if guard.session().scanner.policy() == OverflowPolicy::Disconnect =>
                            {
                                warn!("Closing {}: receive window overflowed.", addr);
                                break Ok(());
                            }
                            // Already logged by the turn; the connection stays open.
                            Err(_) => {}
                        }
                    }
                    Some(Err(e)) => {
                        let e = RelayError::from(e);
                        if is_normal_disconnect(&e) {
                            debug!("Connection from {} closed by peer: {}", addr, e);
                            break Ok(());
                        }
                        break Err(e);
                    }
                    None => {
                        debug!("Connection from {} closed by peer.", addr);
                        break Ok(());
                    }
                }
            }
        };

        // Dropping the guard unsubscribes the session and closes its queue, which lets
        // the writer flush what is already queued and stop. A peer that stopped reading
        // gets a bounded grace period.
        drop(guard);
        match timeout(WRITER_FLUSH_TIMEOUT, &mut writer_task).await {
            Ok(Err(e)) if e.is_panic() => warn!("Writer task for {} panicked: {e:?}", addr),
            Ok(_) => {}
            Err(_) => {
                debug!(
                    "Writer for {} did not flush within {:?}; dropping its backlog.",
                    addr, WRITER_FLUSH_TIMEOUT
                );
                writer_task.abort();
            }
        }
        result
    }
}

/// Helper function to check for non-critical disconnection errors.
fn is_normal_disconnect(e: &RelayError) -> bool {
    matches!(e, RelayError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
