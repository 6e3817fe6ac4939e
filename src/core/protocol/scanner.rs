// src/core/protocol/scanner.rs

//! Implements the per-connection receive window and frame extraction.

use super::{COMMAND_END, COMMAND_START, SUBSCRIBE_END, SUBSCRIBE_START, find_frame};
use crate::core::RelayError;
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a connection does when an incoming chunk does not fit its receive window.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the whole window and the chunk, keep the connection open.
    #[default]
    Discard,
    /// Drop the whole window and the chunk, then close the connection.
    Disconnect,
}

/// A fixed-capacity byte window that reassembles sentinel-delimited frames.
///
/// The window is allocated once; its logical fill length is `len()`. Frames are
/// removed from the front as they are extracted, and a trailing partial frame stays
/// buffered until the next chunk completes it.
#[derive(Debug)]
pub struct FrameScanner {
    window: BytesMut,
    capacity: usize,
    policy: OverflowPolicy,
}

impl FrameScanner {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            window: BytesMut::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    /// The logical fill length of the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Bytes that can still be appended before a chunk overflows the window.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.window.len())
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Appends an incoming chunk to the window.
    ///
    /// If the chunk is larger than the remaining capacity the entire window is
    /// discarded along with the chunk, and `FrameOverflow` is returned. Nothing
    /// already buffered survives an overflow.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), RelayError> {
        let remaining = self.remaining();
        if chunk.len() > remaining {
            warn!(
                "Message doesn't fit the buffer ({} bytes, {} free of {}). Discarding buffered data; adjust buffer_size in the configuration.",
                chunk.len(),
                remaining,
                self.capacity
            );
            self.window.clear();
            return Err(RelayError::FrameOverflow {
                chunk: chunk.len(),
                remaining,
            });
        }
        self.window.extend_from_slice(chunk);
        Ok(())
    }

    /// Extracts the first complete subscribe frame and returns its channel name.
    ///
    /// Everything up to and including the end marker is removed from the window,
    /// including any bytes that preceded the frame.
    pub fn take_subscribe(&mut self) -> Option<String> {
        let span = find_frame(&self.window, SUBSCRIBE_START, SUBSCRIBE_END)?;
        let channel = String::from_utf8_lossy(&self.window[span.body]).into_owned();
        self.window.advance(span.consumed);
        Some(channel)
    }

    /// Extracts the first complete command frame and returns its raw body.
    pub fn take_command(&mut self) -> Option<String> {
        let span = find_frame(&self.window, COMMAND_START, COMMAND_END)?;
        let body = String::from_utf8_lossy(&self.window[span.body]).into_owned();
        self.window.advance(span.consumed);
        Some(body)
    }

    /// Releases everything buffered.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}
