// src/core/mod.rs

//! The central module containing the relay's protocol engine and shared state.

pub mod bridge;
pub mod commands;
pub mod errors;
pub mod lobby;
pub mod metrics;
pub mod protocol;
pub mod pubsub;
pub mod state;
pub mod tasks;

pub use commands::Command;
pub use errors::RelayError;
