// tests/integration/protocol_test.rs

//! Tests for sentinel framing and the per-connection receive window.

use noobhub::core::RelayError;
use noobhub::core::protocol::{
    COMMAND_END, COMMAND_START, FrameScanner, OverflowPolicy, find_frame, subscribe_frame,
    wrap_command,
};

// ===== find_frame =====

#[test]
fn test_find_frame_locates_body() {
    let buf = b"xx__JSON__START__{\"a\":1}__JSON__END__yy";
    let span = find_frame(buf, COMMAND_START, COMMAND_END).unwrap();
    assert_eq!(&buf[span.body.clone()], b"{\"a\":1}");
    assert_eq!(&buf[span.consumed..], b"yy");
}

#[test]
fn test_find_frame_incomplete() {
    assert!(find_frame(b"__JSON__START__{\"a\":", COMMAND_START, COMMAND_END).is_none());
    assert!(find_frame(b"no markers here", COMMAND_START, COMMAND_END).is_none());
    assert!(find_frame(b"", COMMAND_START, COMMAND_END).is_none());
}

#[test]
fn test_find_frame_ignores_end_marker_before_start() {
    let buf = b"__JSON__END____JSON__START__{}";
    assert!(find_frame(buf, COMMAND_START, COMMAND_END).is_none());

    let buf = b"__JSON__END____JSON__START__{}__JSON__END__";
    let span = find_frame(buf, COMMAND_START, COMMAND_END).unwrap();
    assert_eq!(&buf[span.body], b"{}");
    assert_eq!(span.consumed, buf.len());
}

#[test]
fn test_wrap_command_and_subscribe_frame() {
    assert_eq!(
        &wrap_command("{}")[..],
        b"__JSON__START__{}__JSON__END__".as_slice()
    );
    assert_eq!(
        &subscribe_frame("room1")[..],
        b"__SUBSCRIBE__room1__ENDSUBSCRIBE__".as_slice()
    );
}

// ===== FrameScanner =====

#[test]
fn test_scanner_extracts_subscribe() {
    let mut scanner = FrameScanner::new(1024, OverflowPolicy::Discard);
    scanner.push(b"__SUBSCRIBE__lobby-7__ENDSUBSCRIBE__").unwrap();
    assert_eq!(scanner.take_subscribe().as_deref(), Some("lobby-7"));
    assert!(scanner.is_empty());
    assert_eq!(scanner.take_subscribe(), None);
}

#[test]
fn test_scanner_subscribe_removes_preceding_bytes() {
    let mut scanner = FrameScanner::new(1024, OverflowPolicy::Discard);
    scanner
        .push(b"junk__SUBSCRIBE__a__ENDSUBSCRIBE____JSON__START__{}")
        .unwrap();
    assert_eq!(scanner.take_subscribe().as_deref(), Some("a"));
    assert_eq!(scanner.len(), b"__JSON__START__{}".len());
}

#[test]
fn test_scanner_reassembles_split_frame() {
    let mut scanner = FrameScanner::new(1024, OverflowPolicy::Discard);
    scanner.push(b"__JSON__START__{\"action\":").unwrap();
    assert_eq!(scanner.take_command(), None);
    scanner.push(b"\"getServers\"}__JSON__").unwrap();
    assert_eq!(scanner.take_command(), None);
    scanner.push(b"END__").unwrap();
    assert_eq!(
        scanner.take_command().as_deref(),
        Some("{\"action\":\"getServers\"}")
    );
    assert!(scanner.is_empty());
}

#[test]
fn test_scanner_yields_frames_in_order_and_keeps_tail() {
    let mut scanner = FrameScanner::new(1024, OverflowPolicy::Discard);
    scanner
        .push(b"__JSON__START__1__JSON__END____JSON__START__2__JSON__END____JSON__START__3")
        .unwrap();
    assert_eq!(scanner.take_command().as_deref(), Some("1"));
    assert_eq!(scanner.take_command().as_deref(), Some("2"));
    assert_eq!(scanner.take_command(), None);
    assert_eq!(scanner.len(), b"__JSON__START__3".len());
}

#[test]
fn test_scanner_overflow_discards_window() {
    let mut scanner = FrameScanner::new(32, OverflowPolicy::Discard);
    scanner.push(b"__JSON__START__partial").unwrap();
    let filled = scanner.len();

    let chunk = [b'x'; 20];
    let err = scanner.push(&chunk).unwrap_err();
    assert_eq!(
        err,
        RelayError::FrameOverflow {
            chunk: 20,
            remaining: 32 - filled,
        }
    );
    assert!(scanner.is_empty());
    assert_eq!(scanner.remaining(), 32);
    assert_eq!(scanner.take_command(), None);
}

#[test]
fn test_scanner_exact_fit_is_accepted() {
    let mut scanner = FrameScanner::new(8, OverflowPolicy::Disconnect);
    scanner.push(b"12345678").unwrap();
    assert_eq!(scanner.remaining(), 0);
    assert!(scanner.push(b"9").is_err());
    assert_eq!(scanner.policy(), OverflowPolicy::Disconnect);
}

#[test]
fn test_scanner_lossy_utf8() {
    let mut scanner = FrameScanner::new(64, OverflowPolicy::Discard);
    let mut chunk = b"__JSON__START__".to_vec();
    chunk.extend_from_slice(&[0xff, b'a']);
    chunk.extend_from_slice(b"__JSON__END__");
    scanner.push(&chunk).unwrap();
    assert_eq!(scanner.take_command().as_deref(), Some("\u{fffd}a"));
}
