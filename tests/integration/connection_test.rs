// tests/integration/connection_test.rs

//! Drives `ConnectionHandler` over in-memory duplex streams.

use super::test_helpers::{TestContext, unwrap_payload};
use noobhub::config::Config;
use noobhub::connection::ConnectionHandler;
use noobhub::core::protocol::{COMMAND_END, OverflowPolicy, subscribe_frame, wrap_command};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const ACK: &[u8] = b"Hello. Noobhub online. \r\n";

/// Spawns a handler for one in-memory connection and returns the client's end.
fn spawn_client(
    ctx: &TestContext,
    port: u16,
    shutdown_tx: &broadcast::Sender<()>,
) -> (DuplexStream, JoinHandle<()>) {
    spawn_client_with_capacity(ctx, port, shutdown_tx, 64 * 1024)
}

fn spawn_client_with_capacity(
    ctx: &TestContext,
    port: u16,
    shutdown_tx: &broadcast::Sender<()>,
    capacity: usize,
) -> (DuplexStream, JoinHandle<()>) {
    let (client, server) = tokio::io::duplex(capacity);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let handler = ConnectionHandler::new(server, addr, ctx.state.clone(), shutdown_tx.subscribe());
    let task = tokio::spawn(async move {
        handler.run().await.expect("connection ends cleanly");
    });
    (client, task)
}

async fn read_exact(stream: &mut DuplexStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    buf
}

/// Reads until one whole outbound command frame has arrived.
async fn read_frame(stream: &mut DuplexStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    while !out.ends_with(COMMAND_END) {
        timeout(Duration::from_secs(2), stream.read_exact(&mut byte))
            .await
            .expect("read timed out")
            .expect("read failed");
        out.push(byte[0]);
    }
    out
}

async fn wait_for_members(ctx: &TestContext, channel: &str, count: usize) {
    timeout(Duration::from_secs(2), async {
        while ctx.state.hub().registry.subscriber_count(channel) != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("membership did not settle");
}

#[tokio::test]
async fn test_subscribe_receives_ack() {
    let ctx = TestContext::new();
    let (shutdown_tx, _) = broadcast::channel(1);
    let (mut client, task) = spawn_client(&ctx, 7001, &shutdown_tx);

    client.write_all(&subscribe_frame("room1")).await.unwrap();
    assert_eq!(read_exact(&mut client, ACK.len()).await, ACK);
    assert_eq!(ctx.state.hub().registry.subscriber_count("room1"), 1);

    drop(client);
    task.await.unwrap();
    assert_eq!(ctx.state.hub().registry.channel_count(), 0);
}

#[tokio::test]
async fn test_broadcast_between_connections() {
    let ctx = TestContext::new();
    let (shutdown_tx, _) = broadcast::channel(1);
    let (mut a, task_a) = spawn_client(&ctx, 7001, &shutdown_tx);
    let (mut b, task_b) = spawn_client(&ctx, 7002, &shutdown_tx);

    a.write_all(&subscribe_frame("room1")).await.unwrap();
    assert_eq!(read_exact(&mut a, ACK.len()).await, ACK);
    b.write_all(&subscribe_frame("room1")).await.unwrap();
    assert_eq!(read_exact(&mut b, ACK.len()).await, ACK);

    let join = r#"{"action":"updateServerInfo_USERJOINED","id":0,"user":{"steamID":"s1"}}"#;
    let frame = wrap_command(join);
    // Split the frame across two writes to exercise reassembly.
    a.write_all(&frame[..7]).await.unwrap();
    a.flush().await.unwrap();
    a.write_all(&frame[7..]).await.unwrap();

    let seen = unwrap_payload(&read_frame(&mut b).await);
    assert_eq!(seen["action"], "updateServerInfo_USERJOINED");
    assert_eq!(seen["server"]["players"][0]["steamID"], "s1");
    let echoed = unwrap_payload(&read_frame(&mut a).await);
    assert_eq!(echoed, seen);

    drop(a);
    task_a.await.unwrap();
    wait_for_members(&ctx, "room1", 1).await;

    drop(b);
    task_b.await.unwrap();
    assert_eq!(ctx.state.hub().registry.channel_count(), 0);
}

#[tokio::test]
async fn test_overflow_with_discard_keeps_connection() {
    let config = Config {
        buffer_size: 128,
        ..Config::default()
    };
    let ctx = TestContext::with_config(config);
    let (shutdown_tx, _) = broadcast::channel(1);
    let (mut client, task) = spawn_client(&ctx, 7001, &shutdown_tx);

    client.write_all(&subscribe_frame("room1")).await.unwrap();
    assert_eq!(read_exact(&mut client, ACK.len()).await, ACK);

    client.write_all(&[b'x'; 512]).await.unwrap();
    timeout(Duration::from_secs(2), async {
        while ctx.state.stats.get_total_rejected() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("overflow was not recorded");

    client
        .write_all(&wrap_command(r#"{"action":"startGame","id":0}"#))
        .await
        .unwrap();
    let seen = unwrap_payload(&read_frame(&mut client).await);
    assert_eq!(seen["action"], "startGame");
    assert_eq!(ctx.state.hub().registry.subscriber_count("room1"), 1);

    drop(client);
    task.await.unwrap();
}

#[tokio::test]
async fn test_overflow_with_disconnect_policy_closes() {
    let config = Config {
        buffer_size: 64,
        overflow_policy: OverflowPolicy::Disconnect,
        ..Config::default()
    };
    let ctx = TestContext::with_config(config);
    let (shutdown_tx, _) = broadcast::channel(1);
    let (mut client, task) = spawn_client(&ctx, 7001, &shutdown_tx);

    client.write_all(&subscribe_frame("room1")).await.unwrap();
    assert_eq!(read_exact(&mut client, ACK.len()).await, ACK);

    client.write_all(&[b'x'; 256]).await.unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("handler did not close")
        .unwrap();

    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
    assert_eq!(ctx.state.hub().registry.channel_count(), 0);
}

#[tokio::test]
async fn test_shutdown_signal_ends_handler() {
    let ctx = TestContext::new();
    let (shutdown_tx, _) = broadcast::channel(1);
    let (mut client, task) = spawn_client(&ctx, 7001, &shutdown_tx);

    client.write_all(&subscribe_frame("room1")).await.unwrap();
    assert_eq!(read_exact(&mut client, ACK.len()).await, ACK);

    shutdown_tx.send(()).unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("handler ignored shutdown")
        .unwrap();
    assert_eq!(ctx.state.hub().registry.channel_count(), 0);
}

#[tokio::test]
async fn test_half_closed_peer_that_stops_reading_is_torn_down() {
    let ctx = TestContext::new();
    let (shutdown_tx, _) = broadcast::channel(1);
    let (mut client, task) = spawn_client_with_capacity(&ctx, 7001, &shutdown_tx, 256);

    // Queue far more output than the pipe holds, then close the write side
    // without ever reading.
    let mut input = subscribe_frame("room1").to_vec();
    for _ in 0..20 {
        input.extend_from_slice(&wrap_command(r#"{"action":"getServers"}"#));
    }
    client.write_all(&input).await.unwrap();
    client.shutdown().await.unwrap();

    timeout(Duration::from_secs(5), task)
        .await
        .expect("handler stayed blocked on an unread backlog")
        .unwrap();
    assert_eq!(ctx.state.hub().registry.channel_count(), 0);
    assert_eq!(ctx.state.stats.get_total_commands(), 20);
    drop(client);
}
