// src/core/protocol/mod.rs

//! The NoobHub wire protocol: literal sentinel markers delimiting frames inside a
//! raw byte stream. Frames carry no length prefix, so locating them is a plain
//! substring search over the receive window.

pub mod scanner;

pub use scanner::{FrameScanner, OverflowPolicy};

use bytes::{BufMut, Bytes, BytesMut};
use std::ops::Range;

/// Opens a subscribe frame. The channel name follows directly.
pub const SUBSCRIBE_START: &[u8] = b"__SUBSCRIBE__";
/// Closes a subscribe frame.
pub const SUBSCRIBE_END: &[u8] = b"__ENDSUBSCRIBE__";
/// Opens a command frame. A JSON object follows directly.
pub const COMMAND_START: &[u8] = b"__JSON__START__";
/// Closes a command frame.
pub const COMMAND_END: &[u8] = b"__JSON__END__";

/// Sent back on a connection after every successful subscribe frame.
pub const SUBSCRIBE_ACK: &[u8] = b"Hello. Noobhub online. \r\n";

/// The location of one complete frame inside a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpan {
    /// The bytes between the start and end markers.
    pub body: Range<usize>,
    /// The index just past the end marker; everything before it is consumed.
    pub consumed: usize,
}

/// Finds the first complete frame delimited by `start` and `end`.
///
/// The end marker is only searched for after the start marker, so a stray end
/// marker preceding the first start marker never produces a frame. Returns `None`
/// when no complete frame is buffered yet.
pub fn find_frame(haystack: &[u8], start: &[u8], end: &[u8]) -> Option<FrameSpan> {
    let open = find_subslice(haystack, start)?;
    let body_start = open + start.len();
    let close = body_start + find_subslice(&haystack[body_start..], end)?;
    Some(FrameSpan {
        body: body_start..close,
        consumed: close + end.len(),
    })
}

/// Wraps a serialized JSON payload in the command-frame markers.
pub fn wrap_command(json: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(COMMAND_START.len() + json.len() + COMMAND_END.len());
    buf.put_slice(COMMAND_START);
    buf.put_slice(json.as_bytes());
    buf.put_slice(COMMAND_END);
    buf.freeze()
}

/// Builds a subscribe frame for `channel`. Used by clients and tests.
pub fn subscribe_frame(channel: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(SUBSCRIBE_START.len() + channel.len() + SUBSCRIBE_END.len());
    buf.put_slice(SUBSCRIBE_START);
    buf.put_slice(channel.as_bytes());
    buf.put_slice(SUBSCRIBE_END);
    buf.freeze()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
