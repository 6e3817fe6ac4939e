// src/main.rs

//! The main entry point for the Noobhub relay server.

use anyhow::Result;
use noobhub::config::Config;
use noobhub::server;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("Noobhub version {VERSION}");
        return Ok(());
    }

    // The config path can be provided via --config; otherwise "config.toml" is
    // used when present and the built-in defaults when not.
    let explicit_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let config_path = explicit_path.unwrap_or(DEFAULT_CONFIG_PATH);

    let mut config = match Config::load(config_path, explicit_path.is_some()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    };

    if let Some(port_index) = args.iter().position(|arg| arg == "--port") {
        if let Some(port_str) = args.get(port_index + 1) {
            match port_str.parse::<u16>() {
                Ok(port) => config.port = port,
                _ => {
                    eprintln!("Invalid port number: {port_str}");
                    std::process::exit(1);
                }
            }
        } else {
            eprintln!("--port flag requires a value");
            std::process::exit(1);
        }
    }

    if args.contains(&"--verbose".to_string()) {
        config.verbose = true;
    }

    // Command-line overrides must satisfy the same rules as the file.
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e:#}");
        std::process::exit(1);
    }

    // RUST_LOG wins over the configured level.
    let initial_log_level =
        env::var("RUST_LOG").unwrap_or_else(|_| config.effective_log_level());

    tracing_subscriber::registry()
        .with(EnvFilter::new(initial_log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true),
        )
        .init();

    info!("Starting Noobhub {VERSION}");

    if let Err(e) = server::run(config).await {
        error!("Server runtime error: {}", e);
        return Err(e);
    }

    Ok(())
}
