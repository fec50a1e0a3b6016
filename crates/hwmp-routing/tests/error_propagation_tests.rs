//! Path error generation and upstream invalidation.

use std::time::Duration;

use hwmp_core::data::MeshDataHeader;
use hwmp_core::element::{FailedDestination, PerrElement};
use hwmp_core::frame::ControlFrame;
use hwmp_core::types::MacAddress;
use hwmp_routing::HwmpConfig;
use hwmp_routing::protocol::{DropReason, ProtocolEvent, RouteChangeKind};
use hwmp_routing::testing::{MeshSim, SIM_PROTOCOL};

const LINK_METRIC: u32 = 10;

fn perrs_from(sim: &MeshSim, node: usize) -> Vec<(MacAddress, PerrElement)> {
    sim.frames_from(node)
        .filter_map(|f| match f.control() {
            Some(ControlFrame::Perr(perr)) => Some((f.receiver, perr)),
            _ => None,
        })
        .collect()
}

/// A - B - C - D with a resolved path from A to D.
fn discovered_line() -> MeshSim {
    let config = HwmpConfig {
        unicast_preq_threshold: 0,
        ..HwmpConfig::default()
    };
    let mut sim = MeshSim::line(4, &config, LINK_METRIC, 11).unwrap();
    sim.request_route(0, sim.address(3), b"warmup");
    sim.run_for(Duration::from_millis(50));
    assert_eq!(sim.delivered_to(3).len(), 1);
    sim.clear_frames();
    sim
}

// ---------------------------------------------------------------------------
// Link failure cascade
// ---------------------------------------------------------------------------

#[test]
fn broken_link_invalidates_route_upstream() {
    let mut sim = discovered_line();
    let d = sim.address(3);
    let max_ttl = sim.node(2).config().max_ttl;

    sim.unlink(2, 3);
    sim.run_for(Duration::from_millis(50));

    // C tells its only precursor for D, with D's seqno bumped past the route's.
    let c_perrs = perrs_from(&sim, 2);
    assert_eq!(c_perrs.len(), 1);
    assert_eq!(c_perrs[0].0, sim.address(1));
    assert_eq!(c_perrs[0].1.ttl, max_ttl);
    assert_eq!(c_perrs[0].1.destinations, vec![FailedDestination { destination: d, seqno: 2 }]);
    assert_eq!(sim.node(2).statistics().initiated_perr, 1);

    // B forwards it to A with one less hop of TTL.
    let b_perrs = perrs_from(&sim, 1);
    assert_eq!(b_perrs.len(), 1);
    assert_eq!(b_perrs[0].0, sim.address(0));
    assert_eq!(b_perrs[0].1.ttl, max_ttl - 1);
    assert_eq!(sim.node(1).statistics().initiated_perr, 0);

    // A has nobody left to tell.
    assert!(perrs_from(&sim, 0).is_empty());

    let now = sim.now();
    for node in 0..3 {
        assert!(
            sim.node(node).routing_table().lookup_reactive(&d, now).is_none(),
            "node {node} still routes to D"
        );
    }
    assert!(sim.events(0).iter().any(|e| matches!(
        e,
        ProtocolEvent::RouteChanged(change)
            if change.kind == RouteChangeKind::DeleteReactive && change.destination == d
    )));

    // Routes that never used the broken hop survive.
    assert!(sim.node(2).routing_table().lookup_reactive(&sim.address(0), now).is_some());
}

#[test]
fn expired_relay_route_reports_to_its_precursor() {
    let mut sim = discovered_line();
    let a = sim.address(0);
    let d = sim.address(3);
    let seqno = sim.node(1).routing_table().reactive_entry(&d).unwrap().seqno;
    let timeout = sim.node(1).config().active_path_timeout;

    // Nothing refreshes the path, so B's route to D lapses at the next
    // maintenance pass after the timeout.
    sim.run_for(timeout + Duration::from_secs(2));

    assert!(sim.node(1).routing_table().reactive_entry(&d).is_none());
    assert!(sim.node(1).statistics().initiated_perr >= 1);
    let to_a: Vec<_> = perrs_from(&sim, 1)
        .into_iter()
        .filter(|(receiver, _)| *receiver == a)
        .collect();
    assert!(!to_a.is_empty(), "A used B toward D and must hear about it");
    assert!(to_a.iter().any(|(_, perr)| perr
        .destinations
        .contains(&FailedDestination { destination: d, seqno: seqno.wrapping_add(1) })));
    assert!(sim.events(1).iter().any(|e| matches!(
        e,
        ProtocolEvent::RouteChanged(change)
            if change.kind == RouteChangeKind::DeleteReactive && change.destination == d
    )));
}

#[test]
fn new_packet_after_failure_starts_fresh_discovery() {
    let mut sim = discovered_line();
    let d = sim.address(3);
    sim.unlink(2, 3);
    sim.run_for(Duration::from_millis(50));

    sim.request_route(0, d, b"again");
    assert!(sim.node(0).discovery_in_flight(&d));
    assert_eq!(sim.node(0).statistics().initiated_preq, 2);
}

#[test]
fn perr_from_a_non_next_hop_is_ignored() {
    let mut sim = discovered_line();
    let d = sim.address(3);
    let mut perr = PerrElement::new(32);
    perr.add_destination(FailedDestination { destination: d, seqno: 9 });
    let bytes = ControlFrame::Perr(perr).encode();

    // A reaches D through B, so a PERR claiming to come from C does nothing.
    sim.inject_control(0, sim.address(2), &bytes, LINK_METRIC).unwrap();
    assert!(sim.node(0).routing_table().reactive_entry(&d).is_some());
}

#[test]
fn perr_with_older_seqno_is_ignored() {
    let mut sim = discovered_line();
    let d = sim.address(3);
    let route_seqno = sim.node(0).routing_table().reactive_entry(&d).unwrap().seqno;
    let mut perr = PerrElement::new(32);
    perr.add_destination(FailedDestination {
        destination: d,
        seqno: route_seqno.wrapping_sub(1),
    });
    let bytes = ControlFrame::Perr(perr).encode();

    sim.inject_control(0, sim.address(1), &bytes, LINK_METRIC).unwrap();
    assert!(sim.node(0).routing_table().reactive_entry(&d).is_some());
}

#[test]
fn perr_with_single_hop_ttl_is_not_forwarded() {
    let mut sim = discovered_line();
    let d = sim.address(3);
    let mut perr = PerrElement::new(1);
    perr.add_destination(FailedDestination { destination: d, seqno: 5 });
    let bytes = ControlFrame::Perr(perr).encode();

    // B's route to D goes through C; B has A as precursor but TTL is spent.
    sim.inject_control(1, sim.address(2), &bytes, LINK_METRIC).unwrap();
    sim.run_for(Duration::from_millis(10));
    assert!(sim.node(1).routing_table().reactive_entry(&d).is_none());
    assert!(perrs_from(&sim, 1).is_empty());
    assert!(sim.node(0).routing_table().reactive_entry(&d).is_some());
}

// ---------------------------------------------------------------------------
// Relay without a route
// ---------------------------------------------------------------------------

fn data_frame(source: MacAddress, destination: MacAddress, seqno: u32, ttl: u8) -> Vec<u8> {
    MeshDataHeader {
        ttl,
        seqno,
        source,
        destination,
        protocol: SIM_PROTOCOL,
    }
    .encode(b"payload")
}

#[test]
fn relay_without_route_drops_and_reports_to_transmitter() {
    let mut sim = MeshSim::line(2, &HwmpConfig::default(), LINK_METRIC, 12).unwrap();
    let a = sim.address(0);
    let nowhere = MacAddress::from_index(50);

    sim.inject_data(1, a, &data_frame(a, nowhere, 1, 32)).unwrap();

    let b = sim.node(1);
    assert_eq!(b.statistics().total_dropped, 1);
    assert_eq!(b.statistics().initiated_perr, 1);
    assert!(sim.events(1).iter().any(|e| matches!(
        e,
        ProtocolEvent::PacketDropped { destination, reason: DropReason::NoRoute } if *destination == nowhere
    )));
    let perrs = perrs_from(&sim, 1);
    assert_eq!(perrs.len(), 1);
    assert_eq!(perrs[0].0, a);
    assert_eq!(perrs[0].1.destinations, vec![FailedDestination { destination: nowhere, seqno: 1 }]);
}

#[test]
fn relay_with_exhausted_ttl_drops_silently() {
    let mut sim = MeshSim::line(2, &HwmpConfig::default(), LINK_METRIC, 13).unwrap();
    let a = sim.address(0);

    sim.inject_data(1, a, &data_frame(a, MacAddress::from_index(50), 1, 1)).unwrap();

    let stats = sim.node(1).statistics();
    assert_eq!(stats.dropped_ttl, 1);
    assert_eq!(stats.initiated_perr, 0);
    assert!(sim.frames().is_empty());
}

#[test]
fn repeated_frame_is_delivered_once() {
    let mut sim = MeshSim::line(2, &HwmpConfig::default(), LINK_METRIC, 15).unwrap();
    let a = sim.address(0);
    let b = sim.address(1);
    let frame = data_frame(a, b, 7, 32);

    sim.inject_data(1, a, &frame).unwrap();
    sim.inject_data(1, a, &frame).unwrap();

    assert_eq!(sim.delivered_to(1).len(), 1);
    assert_eq!(sim.node(1).statistics().duplicate_frames, 1);
    assert!(sim.events(1).iter().any(|e| matches!(
        e,
        ProtocolEvent::PacketDropped { destination, reason: DropReason::DuplicateFrame } if *destination == b
    )));
    // A unicast duplicate is not answered with a PRUNE.
    assert_eq!(sim.node(1).statistics().initiated_prune, 0);
}

#[test]
fn perrs_are_rate_limited_per_interface() {
    let mut sim = MeshSim::line(2, &HwmpConfig::default(), LINK_METRIC, 14).unwrap();
    let a = sim.address(0);
    let interval = sim.node(1).config().perr_min_interval;

    sim.inject_data(1, a, &data_frame(a, MacAddress::from_index(50), 1, 32)).unwrap();
    sim.inject_data(1, a, &data_frame(a, MacAddress::from_index(51), 2, 32)).unwrap();
    let times: Vec<Duration> = sim
        .frames_from(1)
        .filter(|f| matches!(f.control(), Some(ControlFrame::Perr(_))))
        .map(|f| f.time)
        .collect();
    assert_eq!(times.len(), 1, "second PERR must wait");

    sim.run_for(interval * 2);
    let perrs = perrs_from(&sim, 1);
    assert_eq!(perrs.len(), 2);
    assert_eq!(perrs[1].1.destinations[0].destination, MacAddress::from_index(51));
    let second = sim
        .frames_from(1)
        .filter(|f| matches!(f.control(), Some(ControlFrame::Perr(_))))
        .nth(1)
        .unwrap()
        .time;
    assert_eq!(second, interval);
}
