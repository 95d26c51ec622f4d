//! Framing and carry-buffer behaviour of `Input` (spec.md §8 scenarios 1-2, plus the
//! sequence-monotonicity and write-idempotence properties).

mod common;

use bgp_pipe::pipe::{CallbackFilter, Direction, Options, Pipe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn partial_then_complete_keepalive_is_framed_once() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let seen: Arc<Mutex<Vec<(bgp_pipe::pipe::MessageType, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = seen.clone();
    let cb = Arc::new(bgp_pipe::pipe::Callback::new(
        1,
        bgp_pipe::pipe::DirectionMask::BOTH,
        Arc::new(move |msg| {
            seen_cb.lock().unwrap().push((msg.msg_type, msg.seq));
            true
        }),
    ));

    let input = pipe.attach_input(Direction::R, &[cb], false, CallbackFilter::all());

    let bytes = common::keepalive_bytes();
    let (prefix, suffix) = bytes.split_at(2);
    let n = input.write_bytes(prefix).await.unwrap();
    assert_eq!(n, 2);
    assert!(seen.lock().unwrap().is_empty(), "no message should be framed from 2 bytes");

    input.write_bytes(suffix).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let got = seen.lock().unwrap().clone();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].0, bgp_pipe::pipe::MessageType::KeepAlive);
}

#[tokio::test]
async fn bad_marker_emits_parse_event_and_drops_message() {
    let pipe = Pipe::new(Options::default());

    let parse_events = Arc::new(Mutex::new(0usize));
    let parse_events_cb = parse_events.clone();
    let handler = Arc::new(bgp_pipe::pipe::Handler::new(
        1,
        vec![bgp_pipe::pipe::event::kind::PARSE.to_string()],
        bgp_pipe::pipe::DirectionMask::BOTH,
        Arc::new(move |_event| {
            *parse_events_cb.lock().unwrap() += 1;
            true
        }),
    ));
    pipe.on_event(handler);
    pipe.start().unwrap();

    let delivered = Arc::new(Mutex::new(0usize));
    let delivered_cb = delivered.clone();
    let cb = Arc::new(bgp_pipe::pipe::Callback::new(
        1,
        bgp_pipe::pipe::DirectionMask::BOTH,
        Arc::new(move |_msg| {
            *delivered_cb.lock().unwrap() += 1;
            true
        }),
    ));
    let input = pipe.attach_input(Direction::R, &[cb], false, CallbackFilter::all());

    // A 19-byte message whose 16-byte prefix is all zero fails the marker check inside
    // `Input`'s own framing step, before a `Message` is ever constructed.
    let bad = vec![0u8; 19];
    let result = input.write_bytes(&bad).await;
    assert!(result.is_err());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*delivered.lock().unwrap(), 0, "malformed frame must never reach the chain");
    assert_eq!(*parse_events.lock().unwrap(), 1, "bad marker must surface exactly one PARSE event");
}

#[tokio::test]
async fn sequence_numbers_strictly_increase_per_input() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let seqs = Arc::new(Mutex::new(Vec::new()));
    let seqs_cb = seqs.clone();
    let cb = Arc::new(bgp_pipe::pipe::Callback::new(
        1,
        bgp_pipe::pipe::DirectionMask::BOTH,
        Arc::new(move |msg| {
            seqs_cb.lock().unwrap().push(msg.seq);
            true
        }),
    ));
    let input = pipe.attach_input(Direction::R, &[cb], false, CallbackFilter::all());

    let mut bytes = Vec::new();
    for _ in 0..5 {
        bytes.extend(common::keepalive_bytes());
    }
    input.write_bytes(&bytes).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let got = seqs.lock().unwrap().clone();
    assert_eq!(got.len(), 5);
    for pair in got.windows(2) {
        assert!(pair[1] > pair[0], "sequence must be strictly increasing: {got:?}");
    }
}

#[tokio::test]
async fn write_empty_slice_is_a_noop() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();
    let input = pipe.attach_input(Direction::R, &[], false, CallbackFilter::all());
    let n = input.write_bytes(&[]).await.unwrap();
    assert_eq!(n, 0);
}
