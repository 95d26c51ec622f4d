//! Callback ordering, DROP short-circuiting, and pool recycling (spec.md §8 scenario 6,
//! plus the pool-correctness property).

mod common;

use bgp_pipe::pipe::{Callback, CallbackFilter, Direction, DirectionMask, Options, Pipe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn pre_and_order_run_but_drop_short_circuits_post() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let ran: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let ran_a = ran.clone();
    let mut a = Callback::new(
        1,
        DirectionMask::BOTH,
        Arc::new(move |_msg| {
            ran_a.lock().unwrap().push("A");
            true
        }),
    );
    a.pre = true;

    let ran_b = ran.clone();
    let mut b = Callback::new(
        2,
        DirectionMask::BOTH,
        Arc::new(move |_msg| {
            ran_b.lock().unwrap().push("B");
            false
        }),
    );
    b.order = 0;

    let ran_c = ran.clone();
    let mut c = Callback::new(
        3,
        DirectionMask::BOTH,
        Arc::new(move |_msg| {
            ran_c.lock().unwrap().push("C");
            true
        }),
    );
    c.post = true;

    let input = pipe.attach_input(
        Direction::R,
        &[Arc::new(a), Arc::new(b), Arc::new(c)],
        false,
        CallbackFilter::all(),
    );

    input.write_bytes(&common::keepalive_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*ran.lock().unwrap(), vec!["A", "B"], "C must never run once B drops the message");
}

#[tokio::test]
async fn dropped_message_is_recycled_in_reset_state() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let cb = Arc::new(Callback::new(1, DirectionMask::BOTH, Arc::new(|_msg| false)));
    let input = pipe.attach_input(Direction::R, &[cb], false, CallbackFilter::all());

    input.write_bytes(&common::keepalive_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let recycled = pipe.get_msg(Direction::R);
    assert_eq!(recycled.seq, 0, "a recycled message must come back through reset()");
    assert_eq!(recycled.ctx.cursor, 0);
    assert!(recycled.raw().is_none());
    assert!(recycled.parsed().is_none());
    pipe.put_msg(recycled);
}
