//! Deterministic in-memory mesh for driving several protocol instances.
//!
//! Nodes live in an arena and are addressed by index: node `i` has the
//! address `MacAddress::from_index(i + 1)` and one interface,
//! [`SIM_INTERFACE`]. Links are symmetric and carry a metric. A frame takes
//! `frame_delay` to cross a link and is lost if the link is gone when it
//! arrives. Events due at the same instant run in the order they were
//! scheduled, and a cancelled timer never fires.

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use hwmp_core::data::MeshDataHeader;
use hwmp_core::frame::ControlFrame;
use hwmp_core::types::{InterfaceId, MacAddress};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::HwmpConfig;
use crate::error::RoutingError;
use crate::protocol::env::{
    Clock, FrameKind, FrameTransport, NeighborProvider, RandomSource, RngSource, TimerEvent,
    TimerHandle, TimerService,
};
use crate::protocol::{
    DataPacket, Delivery, HwmpProtocol, MulticastMembership, ProtocolEvent, RouteOutcome,
};

/// The single interface of every simulated node.
pub const SIM_INTERFACE: InterfaceId = InterfaceId(0);

/// Protocol number stamped on packets sent through [`MeshSim::request_route`].
pub const SIM_PROTOCOL: u16 = 0x0800;

/// Collects the outcomes reported for one packet.
pub type ReplySlot = Rc<RefCell<Vec<RouteOutcome>>>;

/// One frame handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub time: Duration,
    pub sender: MacAddress,
    pub receiver: MacAddress,
    pub kind: FrameKind,
    pub bytes: Vec<u8>,
}

impl FrameRecord {
    #[must_use]
    pub fn control(&self) -> Option<ControlFrame> {
        if self.kind != FrameKind::Control {
            return None;
        }
        ControlFrame::decode(&self.bytes).ok()
    }

    #[must_use]
    pub fn data_header(&self) -> Option<MeshDataHeader> {
        if self.kind != FrameKind::Data {
            return None;
        }
        MeshDataHeader::decode(&self.bytes).ok().map(|(header, _)| header)
    }
}

/// A frame delivered to the upper layer of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDelivery {
    pub time: Duration,
    pub node: usize,
    pub delivery: Delivery,
}

enum Payload {
    Timer(TimerEvent),
    Frame {
        from: usize,
        kind: FrameKind,
        bytes: Vec<u8>,
    },
}

struct Scheduled {
    at: Duration,
    seq: u64,
    node: usize,
    payload: Payload,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

#[derive(Default)]
struct Scheduler {
    queue: BinaryHeap<Reverse<Scheduled>>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl Scheduler {
    fn push(&mut self, at: Duration, node: usize, payload: Payload) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { at, seq, node, payload }));
        seq
    }

    /// Next live event due no later than `deadline`.
    fn pop_due(&mut self, deadline: Duration) -> Option<Scheduled> {
        loop {
            if self.queue.peek().is_none_or(|Reverse(next)| next.at > deadline) {
                return None;
            }
            let Reverse(next) = self.queue.pop()?;
            if !self.cancelled.remove(&next.seq) {
                return Some(next);
            }
        }
    }
}

#[derive(Default)]
struct Topology {
    addresses: Vec<MacAddress>,
    links: BTreeMap<(usize, usize), u32>,
}

impl Topology {
    fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.links
            .range((node, 0)..=(node, usize::MAX))
            .map(|(&(_, peer), _)| peer)
    }

    fn index_of(&self, address: &MacAddress) -> Option<usize> {
        self.addresses.iter().position(|a| a == address)
    }
}

/// The [`Environment`](crate::protocol::Environment) seen by one node while it handles an event.
struct NodeEnv<'a> {
    node: usize,
    now: Duration,
    frame_delay: Duration,
    topology: &'a Topology,
    scheduler: &'a mut Scheduler,
    rng: &'a mut RngSource<StdRng>,
    frames: &'a mut Vec<FrameRecord>,
}

impl Clock for NodeEnv<'_> {
    fn now(&self) -> Duration {
        self.now
    }
}

impl TimerService for NodeEnv<'_> {
    fn schedule(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        TimerHandle(self.scheduler.push(self.now + delay, self.node, Payload::Timer(event)))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.scheduler.cancelled.insert(handle.0);
    }
}

impl NeighborProvider for NodeEnv<'_> {
    fn active_neighbors(&self, interface: InterfaceId) -> Vec<MacAddress> {
        if interface != SIM_INTERFACE {
            return Vec::new();
        }
        self.topology
            .neighbors(self.node)
            .map(|peer| self.topology.addresses[peer])
            .collect()
    }
}

impl FrameTransport for NodeEnv<'_> {
    fn send(&mut self, interface: InterfaceId, receiver: MacAddress, kind: FrameKind, frame: Vec<u8>) {
        self.frames.push(FrameRecord {
            time: self.now,
            sender: self.topology.addresses[self.node],
            receiver,
            kind,
            bytes: frame.clone(),
        });
        if interface != SIM_INTERFACE {
            return;
        }
        let targets: Vec<usize> = if receiver.is_broadcast() {
            self.topology.neighbors(self.node).collect()
        } else {
            self.topology
                .index_of(&receiver)
                .filter(|peer| self.topology.links.contains_key(&(self.node, *peer)))
                .into_iter()
                .collect()
        };
        for target in targets {
            self.scheduler.push(
                self.now + self.frame_delay,
                target,
                Payload::Frame {
                    from: self.node,
                    kind,
                    bytes: frame.clone(),
                },
            );
        }
    }
}

impl RandomSource for NodeEnv<'_> {
    fn uniform(&mut self, min: Duration, max: Duration) -> Duration {
        self.rng.uniform(min, max)
    }
}

/// A mesh of protocol instances on a simulated clock.
pub struct MeshSim {
    now: Duration,
    frame_delay: Duration,
    nodes: Vec<HwmpProtocol>,
    events: Vec<Rc<RefCell<Vec<ProtocolEvent>>>>,
    topology: Topology,
    scheduler: Scheduler,
    rng: RngSource<StdRng>,
    membership: MulticastMembership,
    frames: Vec<FrameRecord>,
    deliveries: Vec<SimDelivery>,
}

impl MeshSim {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            now: Duration::ZERO,
            frame_delay: Duration::from_millis(1),
            nodes: Vec::new(),
            events: Vec::new(),
            topology: Topology::default(),
            scheduler: Scheduler::default(),
            rng: RngSource(StdRng::seed_from_u64(seed)),
            membership: MulticastMembership::new(),
            frames: Vec::new(),
            deliveries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// `n` nodes in a chain, neighbors linked with `metric`.
    pub fn line(n: usize, config: &HwmpConfig, metric: u32, seed: u64) -> Result<Self, RoutingError> {
        let mut sim = Self::new(seed);
        for i in 0..n {
            sim.add_node(config.clone())?;
            if i > 0 {
                sim.link(i - 1, i, metric);
            }
        }
        Ok(sim)
    }

    /// Add a started node and return its index.
    pub fn add_node(&mut self, config: HwmpConfig) -> Result<usize, RoutingError> {
        let index = self.nodes.len();
        let address = MacAddress::from_index(index as u32 + 1);
        let mut protocol = HwmpProtocol::new(address, config, self.membership.clone())?;
        protocol.add_interface(SIM_INTERFACE)?;

        let log: Rc<RefCell<Vec<ProtocolEvent>>> = Rc::default();
        let sink = Rc::clone(&log);
        protocol.set_observer(Box::new(move |event: &ProtocolEvent| {
            sink.borrow_mut().push(event.clone());
        }));

        self.nodes.push(protocol);
        self.events.push(log);
        self.topology.addresses.push(address);
        let (protocol, mut env) = self.split(index);
        protocol.start(&mut env)?;
        Ok(index)
    }

    pub fn link(&mut self, a: usize, b: usize, metric: u32) {
        self.topology.links.insert((a, b), metric);
        self.topology.links.insert((b, a), metric);
    }

    /// Remove the link and report it down to both ends.
    pub fn unlink(&mut self, a: usize, b: usize) {
        self.topology.links.remove(&(a, b));
        self.topology.links.remove(&(b, a));
        for (node, peer) in [(a, b), (b, a)] {
            let peer = self.topology.addresses[peer];
            let (protocol, mut env) = self.split(node);
            protocol.peer_link_status(peer, SIM_INTERFACE, false, &mut env);
        }
    }

    #[must_use]
    pub fn address(&self, node: usize) -> MacAddress {
        self.topology.addresses[node]
    }

    #[must_use]
    pub fn node(&self, node: usize) -> &HwmpProtocol {
        &self.nodes[node]
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn membership(&self) -> &MulticastMembership {
        &self.membership
    }

    pub fn set_root(&mut self, node: usize) {
        let (protocol, mut env) = self.split(node);
        protocol.set_root(&mut env);
    }

    pub fn unset_root(&mut self, node: usize) {
        let (protocol, mut env) = self.split(node);
        protocol.unset_root(&mut env);
    }

    /// Hand a packet from `node`'s upper layer to its protocol.
    pub fn request_route(&mut self, node: usize, destination: MacAddress, payload: &[u8]) -> ReplySlot {
        let slot: ReplySlot = Rc::default();
        let sink = Rc::clone(&slot);
        let packet = DataPacket {
            source: self.address(node),
            destination,
            protocol: SIM_PROTOCOL,
            payload: payload.to_vec(),
        };
        let (protocol, mut env) = self.split(node);
        protocol.request_route(
            packet,
            Box::new(move |outcome| sink.borrow_mut().push(outcome)),
            &mut env,
        );
        slot
    }

    /// Deliver raw control bytes to `node` right now, as if sent by `from`.
    pub fn inject_control(
        &mut self,
        node: usize,
        from: MacAddress,
        bytes: &[u8],
        link_metric: u32,
    ) -> Result<(), RoutingError> {
        let (protocol, mut env) = self.split(node);
        protocol.receive_control(SIM_INTERFACE, from, bytes, link_metric, &mut env)
    }

    /// Deliver a raw data frame to `node` right now, as if sent by `from`.
    pub fn inject_data(&mut self, node: usize, from: MacAddress, bytes: &[u8]) -> Result<(), RoutingError> {
        let time = self.now;
        let (protocol, mut env) = self.split(node);
        if let Some(delivery) = protocol.receive_data(SIM_INTERFACE, from, bytes, &mut env)? {
            self.deliveries.push(SimDelivery { time, node, delivery });
        }
        Ok(())
    }

    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now + duration);
    }

    pub fn run_until(&mut self, deadline: Duration) {
        while let Some(event) = self.scheduler.pop_due(deadline) {
            self.now = event.at;
            self.dispatch(event);
        }
        self.now = self.now.max(deadline);
    }

    #[must_use]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Frames sent by `node`.
    pub fn frames_from(&self, node: usize) -> impl Iterator<Item = &FrameRecord> + '_ {
        let sender = self.address(node);
        self.frames.iter().filter(move |f| f.sender == sender)
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    #[must_use]
    pub fn deliveries(&self) -> &[SimDelivery] {
        &self.deliveries
    }

    /// Payloads delivered to `node`, in arrival order.
    #[must_use]
    pub fn delivered_to(&self, node: usize) -> Vec<Vec<u8>> {
        self.deliveries
            .iter()
            .filter(|d| d.node == node)
            .map(|d| d.delivery.payload.clone())
            .collect()
    }

    /// Observer events reported by `node` so far.
    #[must_use]
    pub fn events(&self, node: usize) -> Vec<ProtocolEvent> {
        self.events[node].borrow().clone()
    }

    fn split(&mut self, node: usize) -> (&mut HwmpProtocol, NodeEnv<'_>) {
        let env = NodeEnv {
            node,
            now: self.now,
            frame_delay: self.frame_delay,
            topology: &self.topology,
            scheduler: &mut self.scheduler,
            rng: &mut self.rng,
            frames: &mut self.frames,
        };
        (&mut self.nodes[node], env)
    }

    fn dispatch(&mut self, event: Scheduled) {
        let node = event.node;
        match event.payload {
            Payload::Timer(timer) => {
                let (protocol, mut env) = self.split(node);
                protocol.handle_timer(timer, &mut env);
            }
            Payload::Frame { from, kind, bytes } => {
                let Some(&metric) = self.topology.links.get(&(from, node)) else {
                    return;
                };
                let sender = self.topology.addresses[from];
                let time = self.now;
                let (protocol, mut env) = self.split(node);
                let delivered = match kind {
                    FrameKind::Control => protocol
                        .receive_control(SIM_INTERFACE, sender, &bytes, metric, &mut env)
                        .map(|()| None),
                    FrameKind::Data => protocol.receive_data(SIM_INTERFACE, sender, &bytes, &mut env),
                };
                match delivered {
                    Ok(Some(delivery)) => self.deliveries.push(SimDelivery { time, node, delivery }),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(node, %sender, error = %e, "simulated frame rejected"),
                }
            }
        }
    }
}
