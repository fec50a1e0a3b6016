//! Root announcements and routing through the root.

use std::time::Duration;

use hwmp_core::element::{FailedDestination, PerrElement, PrepElement, PreqElement};
use hwmp_core::frame::ControlFrame;
use hwmp_core::types::MacAddress;
use hwmp_routing::HwmpConfig;
use hwmp_routing::protocol::{ProtocolEvent, RouteChangeKind};
use hwmp_routing::route::decision::RouteChoice;
use hwmp_routing::testing::MeshSim;

const LINK_METRIC: u32 = 10;

fn proactive_preqs_from(sim: &MeshSim, node: usize) -> Vec<PreqElement> {
    sim.frames_from(node)
        .filter_map(|f| match f.control() {
            Some(ControlFrame::Preq(preq)) if preq.is_proactive() => Some(preq),
            _ => None,
        })
        .collect()
}

fn rooted_line(config: &HwmpConfig, seed: u64) -> MeshSim {
    let mut sim = MeshSim::line(3, config, LINK_METRIC, seed).unwrap();
    sim.set_root(0);
    sim.run_for(Duration::from_millis(500));
    sim
}

#[test]
fn root_announcement_reaches_every_node() {
    let sim = rooted_line(&HwmpConfig::default(), 21);
    let root = sim.address(0);
    let now = sim.now();
    assert!(sim.node(0).is_root());

    let announcements = proactive_preqs_from(&sim, 0);
    assert_eq!(announcements.len(), 1);
    let preq = &announcements[0];
    assert_eq!(preq.metric, 0);
    assert_eq!(preq.destinations.len(), 1);
    assert_eq!(preq.destinations[0].address, MacAddress::BROADCAST);
    assert!(preq.destinations[0].destination_only);
    assert!(preq.destinations[0].reply_and_forward);

    for node in 1..3 {
        assert_eq!(sim.node(node).routing_table().root(), Some(root));
    }
    let c_root = sim.node(2).routing_table().lookup_proactive(now).unwrap();
    assert_eq!(c_root.retransmitter, sim.address(1));
    assert_eq!(c_root.metric, 2 * LINK_METRIC);
    assert!(sim.events(2).iter().any(|e| matches!(
        e,
        ProtocolEvent::RouteChanged(change)
            if change.kind == RouteChangeKind::AddProactive && change.destination == root
    )));
}

#[test]
fn root_learns_routes_back_from_preps() {
    let sim = rooted_line(&HwmpConfig::default(), 22);
    let now = sim.now();
    let root = sim.node(0).routing_table();

    let to_b = root.lookup_reactive(&sim.address(1), now).unwrap();
    let to_c = root.lookup_reactive(&sim.address(2), now).unwrap();
    assert_eq!(to_b.retransmitter, sim.address(1));
    assert_eq!(to_c.retransmitter, sim.address(1));
    assert_eq!(to_c.metric, 2 * LINK_METRIC);
    assert_eq!(sim.node(1).statistics().initiated_prep, 1);
    assert_eq!(sim.node(2).statistics().initiated_prep, 1);
}

#[test]
fn no_prep_flag_suppresses_replies() {
    let config = HwmpConfig {
        root_requests_prep: false,
        ..HwmpConfig::default()
    };
    let sim = rooted_line(&config, 23);
    let now = sim.now();
    assert_eq!(sim.node(2).routing_table().root(), Some(sim.address(0)));
    assert_eq!(sim.node(1).statistics().initiated_prep, 0);
    assert_eq!(sim.node(2).statistics().initiated_prep, 0);
    assert!(sim.node(0).routing_table().lookup_reactive(&sim.address(2), now).is_none());
}

#[test]
fn unknown_destination_goes_through_root_without_discovery() {
    let mut sim = rooted_line(&HwmpConfig::default(), 24);
    let outside = MacAddress::from_index(77);

    let reply = sim.request_route(2, outside, b"out");
    let outcomes = reply.borrow();
    assert_eq!(outcomes.len(), 1);
    let forwarded = outcomes[0].unwrap();
    assert_eq!(forwarded.receiver, sim.address(1));
    assert_eq!(sim.node(2).statistics().initiated_preq, 0);
    assert!(!sim.node(2).discovery_in_flight(&outside));
    assert!(matches!(
        sim.node(2).route_to(&outside, sim.now()),
        RouteChoice::Proactive(_)
    ));
}

#[test]
fn reactive_route_wins_over_root() {
    let sim = rooted_line(&HwmpConfig::default(), 25);
    let root = sim.address(0);
    let now = sim.now();
    // B holds both a reactive and a proactive route toward the root.
    let b = sim.node(1);
    assert!(b.routing_table().lookup_proactive(now).is_some());
    assert!(b.routing_table().lookup_reactive(&root, now).is_some());
    assert!(matches!(b.route_to(&root, now), RouteChoice::Reactive(_)));
}

#[test]
fn announcements_repeat_with_increasing_seqno() {
    let config = HwmpConfig::default();
    let interval = config.path_to_root_interval;
    let mut sim = rooted_line(&config, 26);
    sim.run_for(interval * 2);

    let seqnos: Vec<u32> = proactive_preqs_from(&sim, 0).iter().map(|p| p.originator_seqno).collect();
    assert_eq!(seqnos.len(), 3);
    assert!(seqnos.windows(2).all(|w| w[1] > w[0]));
    // B forwards every announcement once.
    assert_eq!(proactive_preqs_from(&sim, 1).len(), 3);
}

#[test]
fn unset_root_stops_announcements_and_routes_expire() {
    let mut sim = rooted_line(&HwmpConfig::default(), 27);
    let root = sim.address(0);
    sim.unset_root(0);
    assert!(!sim.node(0).is_root());
    sim.clear_frames();

    sim.run_for(Duration::from_secs(8));
    assert!(proactive_preqs_from(&sim, 0).is_empty());
    assert_eq!(sim.node(2).routing_table().root(), None);
    assert!(sim.events(2).iter().any(|e| matches!(
        e,
        ProtocolEvent::RouteChanged(change)
            if change.kind == RouteChangeKind::DeleteProactive && change.destination == root
    )));
}

#[test]
fn set_root_twice_keeps_one_schedule() {
    let mut sim = MeshSim::line(2, &HwmpConfig::default(), LINK_METRIC, 28).unwrap();
    sim.set_root(0);
    sim.set_root(0);
    sim.run_for(Duration::from_millis(500));
    assert_eq!(proactive_preqs_from(&sim, 0).len(), 1);
}

#[test]
fn perr_from_root_next_hop_spares_reactive_route_elsewhere() {
    let mut sim = rooted_line(&HwmpConfig::default(), 29);
    let root = sim.address(0);
    let b = sim.address(1);
    let c = sim.address(2);
    let other = MacAddress::from_index(40);
    let root_seqno = sim.node(2).routing_table().proactive_entry().unwrap().seqno;

    // C learns a fresher reactive path to the root through another neighbor.
    let prep = PrepElement {
        flags: 0,
        hop_count: 0,
        ttl: 32,
        destination: c,
        destination_seqno: 1,
        lifetime: 5000,
        metric: 0,
        originator: root,
        originator_seqno: root_seqno + 10,
    };
    sim.inject_control(2, other, &ControlFrame::Prep(prep).encode(), LINK_METRIC)
        .unwrap();
    assert_eq!(sim.node(2).routing_table().reactive_entry(&root).unwrap().retransmitter, other);
    assert_eq!(sim.node(2).routing_table().proactive_entry().unwrap().retransmitter, b);

    // B reports the root lost; only the root route through B goes.
    let mut perr = PerrElement::new(32);
    perr.add_destination(FailedDestination {
        destination: root,
        seqno: root_seqno + 1,
    });
    sim.inject_control(2, b, &ControlFrame::Perr(perr).encode(), LINK_METRIC)
        .unwrap();

    let table = sim.node(2).routing_table();
    assert!(table.proactive_entry().is_none());
    assert_eq!(table.reactive_entry(&root).unwrap().retransmitter, other);
    assert!(sim.events(2).iter().any(|e| matches!(
        e,
        ProtocolEvent::RouteChanged(change)
            if change.kind == RouteChangeKind::DeleteProactive && change.destination == root
    )));
}
