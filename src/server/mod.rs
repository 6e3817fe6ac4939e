// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod spawner;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Bind the listener and build the shared state and the optional bridge.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn the reaper, the bridge and the metrics endpoint.
    spawner::spawn_all(&mut server_context);

    // 3. Accept connections until a shutdown signal or a background failure.
    connection_loop::run(server_context).await
}
