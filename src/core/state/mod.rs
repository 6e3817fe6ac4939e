// src/core/state/mod.rs

//! Defines the central `ServerState` struct and its components.

mod core;
mod stats;

pub use core::{Hub, ServerState, TurnReport};
pub use stats::StatsState;
