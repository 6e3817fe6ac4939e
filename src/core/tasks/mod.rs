// src/core/tasks/mod.rs

//! Long-running background tasks that maintain the relay's shared state.

pub mod reaper;
