//! Whole-session tests: a scripted driver on one side, the filter on the
//! other, both sides as in-memory pkt-line streams.

use std::io::{empty, sink, Cursor, Empty};
use std::path::PathBuf;

use pktfilter_core::Capability;
use pktfilter_protocol::{serve, FilterConfig, FilterError, Packet, PktChannel, SessionLog};
use tempfile::TempDir;

type Driver = PktChannel<Empty, Vec<u8>>;

fn driver() -> Driver {
    let mut d = PktChannel::new(empty(), Vec::new());
    d.write_line("git-filter-client").unwrap();
    d.write_line("version=2").unwrap();
    d.write_flush().unwrap();
    for cap in ["clean", "smudge", "delay"] {
        d.write_line(&format!("capability={cap}")).unwrap();
    }
    d.write_flush().unwrap();
    d
}

fn file_request(d: &mut Driver, command: &str, pathname: &str, meta: &[&str], payload: &[u8]) {
    d.write_line(&format!("command={command}")).unwrap();
    d.write_line(&format!("pathname={pathname}")).unwrap();
    for line in meta {
        d.write_line(line).unwrap();
    }
    d.write_flush().unwrap();
    d.write_stream(payload).unwrap();
    d.write_flush().unwrap();
}

fn list_request(d: &mut Driver) {
    d.write_line("command=list_available_blobs").unwrap();
    d.write_flush().unwrap();
}

struct Outcome {
    result: Result<(), FilterError>,
    /// Responses after the handshake; `None` is a flush.
    replies: Vec<Option<String>>,
    log: String,
}

fn run_session(d: Driver, caps: &[&str], always_delay: bool) -> Outcome {
    let tmp = TempDir::new().unwrap();
    let log_path: PathBuf = tmp.path().join("rot13-filter.log");
    let config = FilterConfig {
        always_delay,
        log_path: log_path.clone(),
        capabilities: caps.iter().copied().map(Capability::from).collect(),
    };
    let input = d.into_parts().1;
    let mut output = Vec::new();
    let mut log = SessionLog::open(&log_path).unwrap();
    let result = serve(Cursor::new(input), &mut output, &config, &mut log);
    drop(log);

    let mut reader = PktChannel::new(Cursor::new(output), sink());
    let mut replies = Vec::new();
    loop {
        match reader.read_packet().unwrap() {
            Packet::Data(data) => replies.push(Some(String::from_utf8(data).unwrap())),
            Packet::Flush => replies.push(None),
            Packet::Eof => break,
        }
    }
    // Server identity, version, flush, one line per capability, flush.
    let handshake_len = 3 + caps.len() + 1;
    let replies = replies.split_off(handshake_len.min(replies.len()));

    Outcome {
        result,
        replies,
        log: std::fs::read_to_string(&log_path).unwrap(),
    }
}

fn line(s: &str) -> Option<String> {
    Some(s.to_string())
}

const ALL: &[&str] = &["clean", "smudge", "delay"];

// ---------------------------------------------------------------------------
// 1. Plain transforms
// ---------------------------------------------------------------------------

#[test]
fn clean_returns_rot13_content() {
    let mut d = driver();
    file_request(&mut d, "clean", "foo.r", &[], b"Hello");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![line("status=success"), None, line("Uryyb"), None, None]
    );
    assert_eq!(
        out.log,
        "START\ninit handshake complete\n\
         IN: clean foo.r 5 [OK] -- OUT: 5 . [OK]\n\
         STOP\n"
    );
}

#[test]
fn empty_content_is_sent_as_zero_packets() {
    let mut d = driver();
    file_request(&mut d, "smudge", "empty.r", &[], b"");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(out.replies, vec![line("status=success"), None, None, None]);
    assert!(out.log.contains("IN: smudge empty.r 0 [OK] -- OUT: 0  [OK]\n"));
}

#[test]
fn metadata_is_logged_in_order() {
    let mut d = driver();
    file_request(
        &mut d,
        "smudge",
        "meta.r",
        &["ref=refs/heads/main", "treeish=abc123", "blob=def456"],
        b"x",
    );
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert!(
        out.log.contains(
            "IN: smudge meta.r ref=refs/heads/main treeish=abc123 blob=def456 1 [OK] -- OUT: 1 . [OK]\n"
        ),
        "log was: {}",
        out.log
    );
}

#[test]
fn unnegotiated_command_is_fatal() {
    let mut d = driver();
    file_request(&mut d, "smudge", "foo.r", &[], b"Hello");
    let out = run_session(d, &["clean"], false);

    let err = out.result.unwrap_err();
    assert!(matches!(err, FilterError::UnsupportedOperation { .. }), "got: {err}");
    assert!(out.replies.is_empty());
}

#[test]
fn unknown_metadata_key_is_fatal() {
    let mut d = driver();
    file_request(&mut d, "clean", "foo.r", &["mode=100644"], b"Hello");
    let err = run_session(d, ALL, false).result.unwrap_err();
    assert!(err.to_string().contains("Unknown message 'mode=100644'"), "got: {err}");
}

#[test]
fn eof_instead_of_pathname_is_fatal() {
    let mut d = driver();
    d.write_line("command=clean").unwrap();
    let err = run_session(d, ALL, false).result.unwrap_err();
    assert!(
        err.to_string().contains("unexpected EOF while expecting pathname"),
        "got: {err}"
    );
}

#[test]
fn unknown_command_is_fatal() {
    let mut d = driver();
    d.write_line("command=process").unwrap();
    let err = run_session(d, ALL, false).result.unwrap_err();
    assert_eq!(err.to_string(), "bad command 'process'");
}

// ---------------------------------------------------------------------------
// 2. Error, abort and write failure hooks
// ---------------------------------------------------------------------------

#[test]
fn error_pathname_reports_error_without_content() {
    let mut d = driver();
    file_request(&mut d, "clean", "error.r", &[], b"data");
    file_request(&mut d, "clean", "after.r", &[], b"abc");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![
            line("status=error"),
            None,
            line("status=success"),
            None,
            line("nop"),
            None,
            None,
        ]
    );
    assert!(out.log.contains("IN: clean error.r 4 [OK] -- [ERROR]\n"));
}

#[test]
fn abort_sticks_to_the_same_command() {
    let mut d = driver();
    file_request(&mut d, "clean", "abort.r", &[], b"data");
    file_request(&mut d, "clean", "next.r", &[], b"abc");
    file_request(&mut d, "smudge", "other.r", &[], b"abc");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![
            line("status=abort"),
            None,
            line("status=abort"),
            None,
            line("status=success"),
            None,
            line("nop"),
            None,
            None,
        ]
    );
    assert!(out.log.contains("IN: clean abort.r 4 [OK] -- [ABORT]\n"));
    assert!(out.log.contains("IN: clean next.r 3 [OK] -- [ABORT]\n"));
}

#[test]
fn write_fail_dies_after_declaring_success() {
    let mut d = driver();
    file_request(&mut d, "clean", "clean-write-fail.r", &[], b"data");
    file_request(&mut d, "clean", "never-read.r", &[], b"abc");
    let out = run_session(d, ALL, false);

    let err = out.result.unwrap_err();
    assert!(matches!(err, FilterError::SimulatedFault { .. }), "got: {err}");
    assert_eq!(err.to_string(), "clean write error");
    assert_eq!(out.replies, vec![line("status=success"), None]);
    assert!(out
        .log
        .ends_with("IN: clean clean-write-fail.r 4 [OK] -- [WRITE FAIL]\n"));
}

#[test]
fn write_fail_is_bound_to_its_command() {
    let mut d = driver();
    file_request(&mut d, "smudge", "clean-write-fail.r", &[], b"abc");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![line("status=success"), None, line("nop"), None, None]
    );
}

// ---------------------------------------------------------------------------
// 3. Delayed delivery
// ---------------------------------------------------------------------------

#[test]
fn delayed_smudge_is_announced_and_served_from_cache() {
    let mut d = driver();
    file_request(&mut d, "smudge", "test-delay10.a", &["can-delay=1"], b"abc");
    list_request(&mut d);
    // Content differs on purpose: the cached result must be returned.
    file_request(&mut d, "smudge", "test-delay10.a", &[], b"");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![
            line("status=delayed"),
            None,
            line("pathname=test-delay10.a"),
            None,
            line("status=success"),
            None,
            line("status=success"),
            None,
            line("nop"),
            None,
            None,
        ]
    );
    assert!(out.log.contains("IN: smudge test-delay10.a 3 [OK] -- [DELAYED]\n"));
    assert!(out.log.contains("IN: list_available_blobs test-delay10.a [OK]\n"));
    assert!(out.log.contains("IN: smudge test-delay10.a 0 [OK] -- OUT: 3 . [OK]\n"));
}

#[test]
fn countdown_of_two_needs_two_queries() {
    let mut d = driver();
    file_request(&mut d, "smudge", "test-delay20.a", &["can-delay=1"], b"abc");
    list_request(&mut d);
    list_request(&mut d);
    list_request(&mut d);
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![
            line("status=delayed"),
            None,
            None,
            line("status=success"),
            None,
            line("pathname=test-delay20.a"),
            None,
            line("status=success"),
            None,
            None,
            line("status=success"),
            None,
        ]
    );
}

#[test]
fn missing_delay_is_dropped_from_announcements() {
    let mut d = driver();
    file_request(&mut d, "smudge", "missing-delay.a", &["can-delay=1"], b"abc");
    list_request(&mut d);
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![line("status=delayed"), None, None, line("status=success"), None]
    );
    assert!(out.log.contains("IN: list_available_blobs [OK]\n"));
}

#[test]
fn invalid_delay_announces_unfiltered_path() {
    let mut d = driver();
    file_request(&mut d, "smudge", "invalid-delay.a", &["can-delay=1"], b"abc");
    list_request(&mut d);
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![
            line("status=delayed"),
            None,
            line("pathname=unfiltered"),
            line("pathname=invalid-delay.a"),
            None,
            line("status=success"),
            None,
        ]
    );
    assert!(out.log.contains("IN: list_available_blobs invalid-delay.a [OK]\n"));
}

#[test]
fn clean_is_never_delayed() {
    let mut d = driver();
    file_request(&mut d, "clean", "test-delay11.a", &["can-delay=1"], b"abc");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![line("status=success"), None, line("nop"), None, None]
    );
}

#[test]
fn always_delay_delays_any_pathname() {
    let mut d = driver();
    file_request(&mut d, "smudge", "plain.r", &["can-delay=1"], b"abc");
    file_request(&mut d, "smudge", "no-delay.r", &[], b"abc");
    list_request(&mut d);
    let out = run_session(d, ALL, true);

    out.result.unwrap();
    assert_eq!(
        out.replies,
        vec![
            line("status=delayed"),
            None,
            line("status=success"),
            None,
            line("nop"),
            None,
            None,
            line("pathname=plain.r"),
            None,
            line("status=success"),
            None,
        ]
    );
}

#[test]
fn without_always_delay_unknown_paths_are_not_delayed() {
    let mut d = driver();
    file_request(&mut d, "smudge", "plain.r", &["can-delay=1"], b"abc");
    let out = run_session(d, ALL, false);

    out.result.unwrap();
    assert_eq!(out.replies[0], line("status=success"));
}

#[test]
fn list_without_flush_is_fatal() {
    let mut d = driver();
    d.write_line("command=list_available_blobs").unwrap();
    d.write_line("pathname=extra").unwrap();
    let err = run_session(d, ALL, false).result.unwrap_err();
    assert!(
        err.to_string().contains("bad list_available_blobs end"),
        "got: {err}"
    );
}
