// src/core/errors.rs

//! Defines the primary error type for the relay.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure a connection turn can produce.
/// None of these are fatal to the process; they are logged where they surface.
#[derive(Error, Debug)]
pub enum RelayError {
    /// An incoming chunk did not fit in the remaining receive window.
    #[error("Frame overflow: chunk of {chunk} bytes exceeds the {remaining} bytes left in the window")]
    FrameOverflow { chunk: usize, remaining: usize },

    /// A command frame body was not valid JSON, or lacked a field its action needs.
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// A command referenced a lobby that does not exist.
    #[error("Invalid lobby reference: {0}")]
    InvalidReference(String),

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    /// Transport error on a connection. Tears the connection down.
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

// `std::io::Error` is not cloneable, so it is shared behind an Arc.
impl Clone for RelayError {
    fn clone(&self) -> Self {
        match self {
            RelayError::FrameOverflow { chunk, remaining } => RelayError::FrameOverflow {
                chunk: *chunk,
                remaining: *remaining,
            },
            RelayError::MalformedCommand(s) => RelayError::MalformedCommand(s.clone()),
            RelayError::InvalidReference(s) => RelayError::InvalidReference(s.clone()),
            RelayError::UnknownAction(s) => RelayError::UnknownAction(s.clone()),
            RelayError::Io(e) => RelayError::Io(Arc::clone(e)),
            RelayError::Internal(s) => RelayError::Internal(s.clone()),
        }
    }
}

impl PartialEq for RelayError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                RelayError::FrameOverflow {
                    chunk: c1,
                    remaining: r1,
                },
                RelayError::FrameOverflow {
                    chunk: c2,
                    remaining: r2,
                },
            ) => c1 == c2 && r1 == r2,
            (RelayError::MalformedCommand(s1), RelayError::MalformedCommand(s2)) => s1 == s2,
            (RelayError::InvalidReference(s1), RelayError::InvalidReference(s2)) => s1 == s2,
            (RelayError::UnknownAction(s1), RelayError::UnknownAction(s2)) => s1 == s2,
            (RelayError::Io(e1), RelayError::Io(e2)) => e1.to_string() == e2.to_string(),
            (RelayError::Internal(s1), RelayError::Internal(s2)) => s1 == s2,
            _ => false,
        }
    }
}

impl RelayError {
    /// A short, stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::FrameOverflow { .. } => "frame_overflow",
            RelayError::MalformedCommand(_) => "malformed_command",
            RelayError::InvalidReference(_) => "invalid_reference",
            RelayError::UnknownAction(_) => "unknown_action",
            RelayError::Io(_) => "connection_fault",
            RelayError::Internal(_) => "internal",
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::MalformedCommand(e.to_string())
    }
}
