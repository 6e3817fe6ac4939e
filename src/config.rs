// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use crate::core::lobby::{Lobby, default_lobbies};
use crate::core::protocol::OverflowPolicy;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    8878
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_host() -> String {
    "::".to_string()
}
fn default_port() -> u16 {
    1337
}
fn default_buffer_size() -> usize {
    1024 * 16 // 16 KB per connection
}
fn default_send_own_messages_back() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_reaper_interval_secs() -> u64 {
    60
}
fn default_keepalive_secs() -> u64 {
    300
}
fn default_max_clients() -> usize {
    10000
}

/// The resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    /// The primary TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The WebSocket bridge port. The bridge is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_port: Option<u16>,
    /// Receive window capacity allocated per connection, in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// If false, a client never receives the broadcast caused by its own command.
    #[serde(default = "default_send_own_messages_back")]
    pub send_own_messages_back: bool,
    /// Turns on debug-level diagnostics for the relay.
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Idle time before TCP keep-alive probes start on a client socket.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// The lobby directory the server starts with.
    #[serde(default = "default_lobbies")]
    pub lobbies: Vec<Lobby>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bridge_port: None,
            buffer_size: default_buffer_size(),
            send_own_messages_back: default_send_own_messages_back(),
            verbose: false,
            log_level: default_log_level(),
            overflow_policy: OverflowPolicy::default(),
            reaper_interval_secs: default_reaper_interval_secs(),
            keepalive_secs: default_keepalive_secs(),
            max_clients: default_max_clients(),
            metrics: MetricsConfig::default(),
            lobbies: default_lobbies(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to load configuration from '{path}'"))?;
        Ok(config)
    }

    /// Loads `path`, or falls back to the built-in defaults when `path` is the
    /// implicit default location and no such file exists.
    pub fn load(path: &str, explicit: bool) -> Result<Self> {
        if !explicit && !Path::new(path).exists() {
            info!("No configuration file at '{}'. Using built-in defaults.", path);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// The tracing filter the server starts with when `RUST_LOG` is unset.
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            format!("{},noobhub=debug", self.log_level)
        } else {
            self.log_level.clone()
        }
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.buffer_size == 0 {
            return Err(anyhow!("buffer_size cannot be 0"));
        }
        if self.reaper_interval_secs == 0 {
            return Err(anyhow!("reaper_interval_secs cannot be 0"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if let Some(bridge_port) = self.bridge_port {
            if bridge_port == 0 {
                return Err(anyhow!("bridge_port cannot be 0"));
            }
            if bridge_port == self.port {
                return Err(anyhow!(
                    "bridge_port ({bridge_port}) must differ from port ({})",
                    self.port
                ));
            }
        }
        if self.metrics.enabled
            && (self.metrics.port == self.port || Some(self.metrics.port) == self.bridge_port)
        {
            return Err(anyhow!(
                "metrics.port ({}) collides with another listener",
                self.metrics.port
            ));
        }

        if self.buffer_size < 1024 {
            warn!(
                "low buffer_size setting: {} bytes. Larger commands will be discarded.",
                self.buffer_size
            );
        }
        if self.lobbies.is_empty() {
            warn!("No lobbies configured. The directory starts empty and commands cannot create lobbies.");
        }
        Ok(())
    }
}
