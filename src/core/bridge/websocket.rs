// src/core/bridge/websocket.rs

//! A WebSocket front end for browser clients. WebSocket clients subscribe with the
//! same subscribe frame as TCP clients and exchange the same wrapped payloads.

use super::Bridge;
use crate::connection::SessionState;
use crate::core::metrics;
use crate::core::protocol::{OverflowPolicy, SUBSCRIBE_ACK, wrap_command};
use crate::core::pubsub::{SubscriptionRegistry, deliver};
use crate::core::state::ServerState;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// The bridge-side subscription registry plus the relay rules it shares with the core.
pub struct WebSocketBridge {
    registry: Mutex<SubscriptionRegistry>,
    send_own_messages_back: bool,
    buffer_size: usize,
}

impl WebSocketBridge {
    pub fn new(send_own_messages_back: bool, buffer_size: usize) -> Self {
        Self {
            registry: Mutex::new(SubscriptionRegistry::new()),
            send_own_messages_back,
            buffer_size,
        }
    }

    pub fn open_session(
        &self,
        addr: SocketAddr,
    ) -> (SessionState, tokio::sync::mpsc::UnboundedReceiver<Bytes>) {
        SessionState::new(addr, self.buffer_size, OverflowPolicy::Discard)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.registry.lock().subscriber_count(channel)
    }

    /// Handles one WebSocket message from `session`.
    ///
    /// A subscribe frame moves the client between bridge channels. Every complete
    /// command frame is relayed, still wrapped, to the other bridge subscribers and
    /// injected into the core for the TCP subscribers of the same channel.
    pub fn handle_message(&self, core: &ServerState, session: &mut SessionState, data: &[u8]) {
        if let Err(e) = session.scanner.push(data) {
            warn!("Bridge client {}: {}", session.id(), e);
            return;
        }

        if let Some(channel) = session.scanner.take_subscribe() {
            self.registry.lock().subscribe(session, &channel);
            session.send(Bytes::from_static(SUBSCRIBE_ACK));
            info!("Bridge client {} subscribes for channel: {}", session.id(), channel);
        }

        while let Some(body) = session.scanner.take_command() {
            let Some(channel) = session.channel().map(str::to_string) else {
                debug!("Bridge client {} sent a payload before subscribing; dropped.", session.id());
                continue;
            };
            let payload = wrap_command(&body);
            let skip = (!self.send_own_messages_back).then_some(*session.id());
            {
                let registry = self.registry.lock();
                deliver(&registry, &channel, &payload, skip.as_ref());
            }
            core.inject(&channel, &payload);
        }
    }

    pub fn close_session(&self, session: &mut SessionState) {
        if let Some(channel) = self.registry.lock().unsubscribe(session) {
            debug!("Bridge client {} left channel {}", session.id(), channel);
        }
        session.release();
    }
}

impl Bridge for WebSocketBridge {
    fn forward(&self, channel: &str, payload: &Bytes) {
        let registry = self.registry.lock();
        deliver(&registry, channel, payload, None);
    }
}

type BridgeContext = (Arc<WebSocketBridge>, Arc<ServerState>);

/// Serves the bridge on `port` until shutdown.
pub async fn run(
    bridge: Arc<WebSocketBridge>,
    state: Arc<ServerState>,
    port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let host = state.config.host.clone();
    let app = Router::new()
        .route("/", get(ws_upgrade))
        .with_state((bridge, state));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("WebSocket bridge listening on {}:{}", host, port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.recv().await.ok();
        info!("WebSocket bridge shutting down.");
    })
    .await?;
    Ok(())
}

async fn ws_upgrade(
    State((bridge, state)): State<BridgeContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, addr, bridge, state))
}

async fn run_socket(
    socket: WebSocket,
    addr: SocketAddr,
    bridge: Arc<WebSocketBridge>,
    state: Arc<ServerState>,
) {
    info!("New bridge client: {}", addr);
    metrics::BRIDGE_CLIENTS.inc();
    let (mut sink, mut stream) = socket.split();
    let (mut session, mut rx) = bridge.open_session(addr);

    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let text = String::from_utf8_lossy(&payload).into_owned();
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                bridge.handle_message(&state, &mut session, text.as_str().as_bytes())
            }
            Ok(Message::Binary(data)) => bridge.handle_message(&state, &mut session, &data),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Bridge client {} errored: {}", addr, e);
                break;
            }
        }
    }

    bridge.close_session(&mut session);
    writer.abort();
    metrics::BRIDGE_CLIENTS.dec();
    if let Err(e) = writer.await
        && e.is_panic()
    {
        error!("Bridge writer for {} panicked: {e:?}", addr);
    }
    debug!("Bridge client {} disconnected", addr);
}
