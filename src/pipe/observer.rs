//! The session observer (spec.md §4.4): runs inline at the tail of the callback chain for
//! every forwarded message, tracking last-OPEN/KEEPALIVE/UPDATE timestamps and end-of-RIB
//! per direction, and publishing the corresponding events.

use crate::models::bgp::BgpMessage;
use crate::models::network::{Afi, Safi};
use crate::pipe::event::kind;
use crate::pipe::line::Line;
use crate::pipe::message::{Message, MessageType};
use crate::pipe::PipeShared;
use std::sync::atomic::{AtomicI64, Ordering};

/// Observes one message that survived the callback chain, updating `line`'s session state
/// and publishing `OPEN`/`ALIVE`/`UPDATE`/`EOR_AF`/`EOR` as the observed condition dictates.
pub async fn observe(msg: &Message, line: &Line, shared: &PipeShared) {
    let now = msg.timestamp.timestamp();

    match msg.msg_type {
        MessageType::Open => {
            if let Some(BgpMessage::Open(open)) = msg.parsed() {
                if cas_if_greater(&line.last_open_ts, now) {
                    *line.open.write().unwrap() = Some(open.clone());
                    shared
                        .events
                        .publish(kind::OPEN, Some(msg.direction), None, None, vec![])
                        .await;
                }
            }
        }
        MessageType::KeepAlive => {
            if cas_if_greater(&line.last_keepalive_ts, now) {
                shared
                    .events
                    .publish(kind::ALIVE, Some(msg.direction), None, None, vec![])
                    .await;
            }
        }
        MessageType::Update => {
            if cas_if_greater(&line.last_update_ts, now) {
                shared
                    .events
                    .publish(kind::UPDATE, Some(msg.direction), None, None, vec![])
                    .await;
            }
            observe_eor(msg, line, shared).await;
        }
        MessageType::Notify | MessageType::Refresh | MessageType::Invalid => {}
    }
}

/// Monotone-timestamp CAS: stores `candidate` only if it's strictly greater than the current
/// value, and reports whether it won the race. Guarantees the at-most-once-per-increasing-
/// timestamp publish rule from spec.md §5.
fn cas_if_greater(cell: &AtomicI64, candidate: i64) -> bool {
    let mut current = cell.load(Ordering::Acquire);
    loop {
        if candidate <= current {
            return false;
        }
        match cell.compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
}

async fn observe_eor(msg: &Message, line: &Line, shared: &PipeShared) {
    let Some(BgpMessage::Update(update)) = msg.parsed() else {
        return;
    };

    let family = if update.withdrawn_prefixes.is_empty()
        && update.announced_prefixes.is_empty()
        && update.attributes.is_empty()
    {
        Some((Afi::Ipv4, Safi::Unicast))
    } else if update.attributes.len() == 1 {
        update
            .attributes
            .get_unreachable()
            .filter(|nlri| nlri.prefixes.is_empty())
            .map(|nlri| (nlri.afi, nlri.safi))
    } else {
        None
    };

    let Some((afi, safi)) = family else {
        return;
    };

    let first_for_family = line.eor_seen.write().unwrap().insert((u16::from(afi), u8::from(safi)));
    if !first_for_family {
        return;
    }

    shared
        .events
        .publish(
            kind::EOR_AF,
            Some(msg.direction),
            None,
            None,
            vec![format!("{}/{}", u16::from(afi), u8::from(safi))],
        )
        .await;

    let target = line.negotiated_family_count().max(1);
    let seen_count = line.eor_seen.read().unwrap().len() as u32;
    if seen_count >= target && !line.eor_done.swap(true, Ordering::AcqRel) {
        shared
            .events
            .publish(kind::EOR, Some(msg.direction), None, None, vec![])
            .await;
    }
}
