//! UPDATE accessor checks and End-of-RIB sequencing (spec.md §8 scenarios 4-5).

mod common;

use bgp_pipe::models::bgp::BgpMessage;
use bgp_pipe::models::network::{Afi, NextHopAddress, Safi};
use bgp_pipe::pipe::event::kind;
use bgp_pipe::pipe::{Callback, CallbackFilter, Direction, DirectionMask, Handler, Options, Pipe};
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn mp_reach_update_exposes_reachable_nlri_and_next_hop() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let seen: Arc<Mutex<Option<BgpMessage>>> = Arc::new(Mutex::new(None));
    let seen_cb = seen.clone();
    let cb = Arc::new(Callback::new(
        1,
        DirectionMask::BOTH,
        Arc::new(move |msg| {
            *seen_cb.lock().unwrap() = msg.parsed().cloned();
            true
        }),
    ));
    let input = pipe.attach_input(Direction::R, &[cb], false, CallbackFilter::all());

    let next_hop = NextHopAddress::Ipv6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
    let bytes = common::mp_reach_update_bytes(next_hop, "2001:db8::/32");
    input.write_bytes(&bytes).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let msg = seen.lock().unwrap().take().expect("callback must see the parsed update");
    let BgpMessage::Update(update) = msg else {
        panic!("expected an Update message");
    };

    let reach = update.attributes.get_reachable().expect("MP_REACH_NLRI must be present");
    assert_eq!(reach.afi, Afi::Ipv6);
    assert_eq!(reach.safi, Safi::Unicast);
    assert_eq!(reach.next_hop, Some(next_hop));
    assert_eq!(reach.prefixes.len(), 1);
    assert_eq!(reach.prefixes[0].prefix.to_string(), "2001:db8::/32");
}

#[tokio::test]
async fn all_reach_concatenates_legacy_nlri_with_mp_reach_nlri() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let seen: Arc<Mutex<Option<BgpMessage>>> = Arc::new(Mutex::new(None));
    let seen_cb = seen.clone();
    let cb = Arc::new(Callback::new(
        1,
        DirectionMask::BOTH,
        Arc::new(move |msg| {
            *seen_cb.lock().unwrap() = msg.parsed().cloned();
            true
        }),
    ));
    let input = pipe.attach_input(Direction::R, &[cb], false, CallbackFilter::all());

    let next_hop = NextHopAddress::Ipv6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
    let bytes = common::mixed_reach_update_bytes("10.0.0.0/24", next_hop, "2001:db8::/32");
    input.write_bytes(&bytes).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let msg = seen.lock().unwrap().take().expect("callback must see the parsed update");
    let BgpMessage::Update(update) = msg else {
        panic!("expected an Update message");
    };

    assert_eq!(update.announced_prefixes.len(), 1, "legacy IPv4 NLRI is untouched");
    assert_eq!(
        update.attributes.get_reachable().map(|nlri| nlri.prefixes.len()),
        Some(1),
        "MP_REACH_NLRI is untouched"
    );

    let all = update.all_reach();
    assert_eq!(all.len(), 2, "all_reach must concatenate both lists");
    let strings: Vec<String> = all.iter().map(|p| p.prefix.to_string()).collect();
    assert!(strings.contains(&"10.0.0.0/24".to_string()));
    assert!(strings.contains(&"2001:db8::/32".to_string()));

    // A second call must return the same (cached) result without re-deriving it.
    assert_eq!(update.all_reach(), all);
}

#[tokio::test]
async fn end_of_rib_fires_once_after_every_negotiated_family_reports() {
    let pipe = Pipe::new(Options::default());
    pipe.start().unwrap();

    let local_in = pipe.attach_input(Direction::L, &[], false, CallbackFilter::all());
    let remote_in = pipe.attach_input(Direction::R, &[], false, CallbackFilter::all());

    // Negotiate IPv4/unicast and IPv6/unicast on both sides, so two distinct families are
    // expected before the overall EOR fires.
    let mut local_bytes = common::open_bytes(
        65001,
        90,
        std::net::Ipv4Addr::new(1, 1, 1, 1),
        vec![common::mp_ipv4_unicast(), common::mp_ipv6_unicast()],
    );
    local_bytes.extend(common::keepalive_bytes());
    local_in.write_bytes(&local_bytes).await.unwrap();

    let mut remote_bytes = common::open_bytes(
        65002,
        180,
        std::net::Ipv4Addr::new(2, 2, 2, 2),
        vec![common::mp_ipv4_unicast(), common::mp_ipv6_unicast()],
    );
    remote_bytes.extend(common::keepalive_bytes());
    remote_in.write_bytes(&remote_bytes).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pipe.shared().negotiated_caps().is_empty(), false);

    let eor_af_count = Arc::new(Mutex::new(0usize));
    let eor_count = Arc::new(Mutex::new(0usize));
    let eor_af_cb = eor_af_count.clone();
    let eor_cb = eor_count.clone();
    pipe.on_event(Arc::new(Handler::new(
        1,
        vec![kind::EOR_AF.to_string(), kind::EOR.to_string()],
        DirectionMask::BOTH,
        Arc::new(move |event| {
            match event.event_type.as_str() {
                kind::EOR_AF => *eor_af_cb.lock().unwrap() += 1,
                kind::EOR => *eor_cb.lock().unwrap() += 1,
                _ => {}
            }
            true
        }),
    )));

    // Legacy (IPv4/unicast) End-of-RIB, then the RFC 4760 IPv6/unicast marker.
    remote_in.write_bytes(&common::legacy_eor_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*eor_af_count.lock().unwrap(), 1);
    assert_eq!(*eor_count.lock().unwrap(), 0, "only one of two families has reported so far");

    remote_in.write_bytes(&common::mp_unreach_eor_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*eor_af_count.lock().unwrap(), 2);
    assert_eq!(*eor_count.lock().unwrap(), 1, "both negotiated families have now reported");

    // A repeat of the same family's EOR must not refire either event.
    remote_in.write_bytes(&common::mp_unreach_eor_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*eor_af_count.lock().unwrap(), 2);
    assert_eq!(*eor_count.lock().unwrap(), 1);
}
