//! Building and starting mesh points from configuration files.

use std::io::Write;
use std::time::Duration;

use hwmp_core::types::{InterfaceId, MacAddress};
use hwmp_node::{MeshNode, NodeConfig, NodeError, logging};
use hwmp_routing::MulticastMembership;
use hwmp_routing::protocol::{
    Clock, FrameKind, FrameTransport, NeighborProvider, RandomSource, TimerEvent, TimerHandle,
    TimerService,
};

/// Records scheduled timers and sent frames, never fires anything.
#[derive(Default)]
struct RecordingEnv {
    timers: Vec<(Duration, TimerEvent)>,
    cancelled: Vec<TimerHandle>,
    sent: Vec<(InterfaceId, MacAddress, FrameKind)>,
}

impl Clock for RecordingEnv {
    fn now(&self) -> Duration {
        Duration::ZERO
    }
}

impl TimerService for RecordingEnv {
    fn schedule(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        self.timers.push((delay, event));
        TimerHandle(self.timers.len() as u64)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.cancelled.push(handle);
    }
}

impl NeighborProvider for RecordingEnv {
    fn active_neighbors(&self, _interface: InterfaceId) -> Vec<MacAddress> {
        Vec::new()
    }
}

impl FrameTransport for RecordingEnv {
    fn send(&mut self, interface: InterfaceId, receiver: MacAddress, kind: FrameKind, _frame: Vec<u8>) {
        self.sent.push((interface, receiver, kind));
    }
}

impl RandomSource for RecordingEnv {
    fn uniform(&mut self, min: Duration, _max: Duration) -> Duration {
        min
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn load_from_file() {
    let file = write_config(
        r#"
[node]
address = "00:00:00:00:00:0a"
interfaces = 2

[hwmp]
max_preq_retries = 1
"#,
    );
    let node = MeshNode::load(file.path()).unwrap();
    assert_eq!(node.address(), MacAddress::from_index(10));
    assert_eq!(node.protocol().config().max_preq_retries, 1);
    assert_eq!(
        node.protocol().interfaces().collect::<Vec<_>>(),
        vec![InterfaceId(0), InterfaceId(1)]
    );
}

#[test]
fn load_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = NodeConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(NodeError::Config(_))));
}

#[test]
fn load_rejects_bad_member_address() {
    let file = write_config(
        r#"
[node]
address = "00:00:00:00:00:01"

[[multicast]]
group = "01:00:5e:00:00:01"
members = ["not-an-address"]
"#,
    );
    assert!(matches!(MeshNode::load(file.path()), Err(NodeError::InvalidAddress(_))));
}

#[test]
fn nodes_can_share_membership() {
    let shared = MulticastMembership::new();
    let first = NodeConfig::parse(
        r#"
[node]
address = "00:00:00:00:00:01"

[[multicast]]
group = "01:00:5e:00:00:01"
members = ["00:00:00:00:00:01"]
"#,
    )
    .unwrap();
    let second = NodeConfig::parse("[node]\naddress = \"00:00:00:00:00:02\"").unwrap();

    let a = MeshNode::with_membership(&first, shared.clone()).unwrap();
    let b = MeshNode::with_membership(&second, shared.clone()).unwrap();
    let group = MacAddress::new([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);
    assert!(b.membership().is_member(&group, &a.address()));
}

// ---------------------------------------------------------------------------
// Starting
// ---------------------------------------------------------------------------

#[test]
fn start_arms_maintenance() {
    logging::init_for_tests();
    let mut node = MeshNode::from_config(&NodeConfig::parse("[node]\naddress = \"00:00:00:00:00:01\"").unwrap())
        .unwrap();
    let mut env = RecordingEnv::default();
    node.start(&mut env).unwrap();
    assert!(node.is_started());
    assert!(!node.protocol().is_root());
    assert_eq!(env.timers, vec![(Duration::from_secs(1), TimerEvent::Maintenance)]);
}

#[test]
fn root_node_schedules_first_announcement() {
    logging::init_for_tests();
    let mut node = MeshNode::from_config(
        &NodeConfig::parse("[node]\naddress = \"00:00:00:00:00:01\"\nroot = true").unwrap(),
    )
    .unwrap();
    let mut env = RecordingEnv::default();
    node.start(&mut env).unwrap();
    assert!(node.protocol().is_root());
    assert!(env.timers.contains(&(Duration::ZERO, TimerEvent::ProactivePreq)));

    // The announcement itself goes nowhere without neighbors.
    node.protocol_mut().handle_timer(TimerEvent::ProactivePreq, &mut env);
    assert!(env.sent.is_empty());
    assert_eq!(node.protocol().statistics().initiated_preq, 1);
}

#[test]
fn start_without_interfaces_fails() {
    logging::init_for_tests();
    let mut node = MeshNode::from_config(
        &NodeConfig::parse("[node]\naddress = \"00:00:00:00:00:01\"\ninterfaces = 0").unwrap(),
    )
    .unwrap();
    let mut env = RecordingEnv::default();
    assert!(matches!(node.start(&mut env), Err(NodeError::Routing(_))));
    assert!(!node.is_started());
    assert!(env.cancelled.is_empty());
}
