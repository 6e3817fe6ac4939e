// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: chunk reassembly,
//! turn execution against the shared state, outbound writes and teardown.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::SessionState;
