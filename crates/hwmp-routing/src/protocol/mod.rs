//! The protocol instance owned by one mesh point.
//!
//! [`HwmpProtocol`] holds every table of the node and is driven entirely
//! from outside: frames, timer expiries and link events come in through its
//! public methods together with a `&mut dyn Environment`, and every reaction
//! happens before the call returns.

pub mod env;
pub mod membership;
pub mod observer;
pub mod reply;
pub mod stats;

mod forwarding;
pub(crate) mod interface;

use std::collections::BTreeMap;
use std::time::Duration;

use hwmp_core::frame::ControlFrame;
use hwmp_core::types::{InterfaceId, MacAddress};

use crate::config::HwmpConfig;
use crate::dedup::SequenceStore;
use crate::error_propagation::PathError;
use crate::discovery::state::DiscoveryTable;
use crate::error::RoutingError;
use crate::prune::PruneTable;
use crate::queue::PendingPacketQueue;
use crate::route::decision::{RouteChoice, choose_route};
use crate::route::{RouteEntry, RoutingTable};

pub use env::{
    Clock, Environment, FrameKind, FrameTransport, NeighborProvider, RandomSource, RngSource,
    TimerEvent, TimerHandle, TimerService,
};
pub use forwarding::Delivery;
pub use membership::MulticastMembership;
pub use observer::{DropReason, ProtocolEvent, ProtocolObserver, RouteChange, RouteChangeKind};
pub use reply::{DataPacket, Forwarded, RouteFailure, RouteOutcome, RouteReply};
pub use stats::Statistics;

use interface::InterfaceState;

/// HWMP state of one mesh point.
pub struct HwmpProtocol {
    pub(crate) address: MacAddress,
    pub(crate) config: HwmpConfig,
    pub(crate) interfaces: BTreeMap<InterfaceId, InterfaceState>,
    pub(crate) routes: RoutingTable,
    pub(crate) sequences: SequenceStore,
    pub(crate) queue: PendingPacketQueue,
    pub(crate) prunes: PruneTable,
    pub(crate) discovery: DiscoveryTable,
    pub(crate) membership: MulticastMembership,
    pub(crate) stats: Statistics,
    observer: Option<Box<dyn ProtocolObserver>>,
    hwmp_seqno: u32,
    preq_id: u32,
    data_seqno: u32,
    pub(crate) is_root: bool,
    pub(crate) proactive_timer: Option<TimerHandle>,
    maintenance_timer: Option<TimerHandle>,
}

impl std::fmt::Debug for HwmpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwmpProtocol")
            .field("address", &self.address)
            .field("interfaces", &self.interfaces.keys().collect::<Vec<_>>())
            .field("routes", &self.routes.len())
            .field("queued", &self.queue.len())
            .field("is_root", &self.is_root)
            .finish_non_exhaustive()
    }
}

impl HwmpProtocol {
    /// Create a protocol instance for the mesh point `address`.
    pub fn new(
        address: MacAddress,
        config: HwmpConfig,
        membership: MulticastMembership,
    ) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self {
            address,
            interfaces: BTreeMap::new(),
            routes: RoutingTable::new(),
            sequences: SequenceStore::new(config.group_seqno_cache_size),
            queue: PendingPacketQueue::new(config.max_queue_size),
            prunes: PruneTable::new(config.prune_lifetime),
            discovery: DiscoveryTable::new(),
            membership,
            stats: Statistics::default(),
            observer: None,
            hwmp_seqno: 0,
            preq_id: 0,
            data_seqno: 0,
            is_root: false,
            proactive_timer: None,
            maintenance_timer: None,
            config,
        })
    }

    #[must_use]
    pub fn address(&self) -> MacAddress {
        self.address
    }

    #[must_use]
    pub fn config(&self) -> &HwmpConfig {
        &self.config
    }

    pub fn add_interface(&mut self, interface: InterfaceId) -> Result<(), RoutingError> {
        if self.interfaces.contains_key(&interface) {
            return Err(RoutingError::DuplicateInterface(interface));
        }
        self.interfaces.insert(interface, InterfaceState::default());
        tracing::debug!(address = %self.address, %interface, "interface added");
        Ok(())
    }

    pub fn interfaces(&self) -> impl Iterator<Item = InterfaceId> + '_ {
        self.interfaces.keys().copied()
    }

    /// Register the observer. A later call replaces the earlier one.
    pub fn set_observer(&mut self, observer: Box<dyn ProtocolObserver>) {
        self.observer = Some(observer);
    }

    /// Arm the periodic maintenance timer.
    pub fn start(&mut self, env: &mut dyn Environment) -> Result<(), RoutingError> {
        if self.interfaces.is_empty() {
            return Err(RoutingError::NoInterfaces);
        }
        if let Some(timer) = self.maintenance_timer.take() {
            timer.cancel(env);
        }
        self.maintenance_timer = Some(env.schedule(self.config.maintenance_interval, TimerEvent::Maintenance));
        tracing::info!(address = %self.address, interfaces = self.interfaces.len(), "HWMP started");
        Ok(())
    }

    /// Start announcing this node as root after a random offset.
    pub fn set_root(&mut self, env: &mut dyn Environment) {
        if self.is_root {
            return;
        }
        self.is_root = true;
        let delay = env.uniform(Duration::ZERO, self.config.random_start);
        self.proactive_timer = Some(env.schedule(delay, TimerEvent::ProactivePreq));
        tracing::info!(address = %self.address, first_preq_ms = delay.as_millis() as u64, "acting as root");
    }

    pub fn unset_root(&mut self, env: &mut dyn Environment) {
        if !self.is_root {
            return;
        }
        self.is_root = false;
        if let Some(timer) = self.proactive_timer.take() {
            timer.cancel(env);
        }
        tracing::info!(address = %self.address, "no longer root");
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Dispatch a fired timer.
    pub fn handle_timer(&mut self, event: TimerEvent, env: &mut dyn Environment) {
        match event {
            TimerEvent::PreqRetry {
                destination,
                attempt,
            } => self.retry_discovery(destination, attempt, env),
            TimerEvent::ProactivePreq => self.send_proactive_preq(env),
            TimerEvent::FlushPreq { interface } => self.flush_preqs(interface, env),
            TimerEvent::FlushPerr { interface } => self.flush_perrs(interface, env),
            TimerEvent::Maintenance => self.run_maintenance(env),
        }
    }

    /// Handle a control frame received from neighbor `from` on `interface`.
    ///
    /// `link_metric` is the cost of the link toward `from`. A frame that does
    /// not decode is counted and rejected without touching any table.
    pub fn receive_control(
        &mut self,
        interface: InterfaceId,
        from: MacAddress,
        frame: &[u8],
        link_metric: u32,
        env: &mut dyn Environment,
    ) -> Result<(), RoutingError> {
        if !self.interfaces.contains_key(&interface) {
            return Err(RoutingError::UnknownInterface(interface));
        }
        let frame = match ControlFrame::decode(frame) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.malformed_elements += 1;
                tracing::warn!(address = %self.address, %from, %interface, error = %e, "malformed control frame dropped");
                return Err(e.into());
            }
        };
        match frame {
            ControlFrame::Preq(preq) => self.receive_preq(preq, from, interface, link_metric, env),
            ControlFrame::Prep(prep) => self.receive_prep(prep, from, interface, link_metric, env),
            ControlFrame::Perr(perr) => self.receive_perr(perr, from, interface, env),
            ControlFrame::Prune(prune) => self.receive_prune(prune, from, interface, env),
        }
        Ok(())
    }

    /// React to a peer link coming up or going down.
    pub fn peer_link_status(
        &mut self,
        peer: MacAddress,
        interface: InterfaceId,
        up: bool,
        env: &mut dyn Environment,
    ) {
        if up {
            tracing::debug!(address = %self.address, %peer, %interface, "peer link up");
            return;
        }
        let failed = self.routes.unreachable_via(&peer);
        tracing::info!(
            address = %self.address,
            %peer,
            %interface,
            destinations = failed.len(),
            "peer link down"
        );
        if failed.is_empty() {
            return;
        }
        let now = env.now();
        let error = self.make_path_error(failed, now, |entry, _| entry.retransmitter == peer);
        self.initiate_path_error(error, env);
    }

    #[must_use]
    pub fn routing_table(&self) -> &RoutingTable {
        &self.routes
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    /// Packets parked waiting for a route.
    #[must_use]
    pub fn queued_packets(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn discovery_in_flight(&self, destination: &MacAddress) -> bool {
        self.discovery.in_flight(destination)
    }

    #[must_use]
    pub fn prune_table(&self) -> &PruneTable {
        &self.prunes
    }

    #[must_use]
    pub fn sequence_store(&self) -> &SequenceStore {
        &self.sequences
    }

    /// Best current route toward `destination`: reactive first, then the root.
    #[must_use]
    pub fn route_to(&self, destination: &MacAddress, now: Duration) -> RouteChoice {
        choose_route(
            self.routes.lookup_reactive(destination, now),
            self.routes.lookup_proactive(now),
        )
    }

    pub(crate) fn next_hwmp_seqno(&mut self) -> u32 {
        self.hwmp_seqno = self.hwmp_seqno.wrapping_add(1);
        self.hwmp_seqno
    }

    pub(crate) fn next_preq_id(&mut self) -> u32 {
        self.preq_id = self.preq_id.wrapping_add(1);
        self.preq_id
    }

    pub(crate) fn next_data_seqno(&mut self) -> u32 {
        self.data_seqno = self.data_seqno.wrapping_add(1);
        self.data_seqno
    }

    pub(crate) fn notify(&mut self, event: ProtocolEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.notify(&event);
        }
    }

    /// Hand a frame to the transport and account for it.
    pub(crate) fn transmit(
        &mut self,
        env: &mut dyn Environment,
        interface: InterfaceId,
        receiver: MacAddress,
        kind: FrameKind,
        frame: Vec<u8>,
    ) {
        if receiver.is_broadcast() {
            self.stats.tx_broadcast += 1;
        } else {
            self.stats.tx_unicast += 1;
        }
        self.stats.tx_bytes += frame.len() as u64;
        env.send(interface, receiver, kind, frame);
    }

    /// Offer a reactive route and report it when accepted.
    pub(crate) fn install_route(&mut self, entry: RouteEntry, now: Duration) -> bool {
        let change = route_change(RouteChangeKind::AddReactive, &entry, now);
        if !self.routes.add_or_update(entry).accepted() {
            self.stats.rejected_route_updates += 1;
            return false;
        }
        self.notify(ProtocolEvent::RouteChanged(change));
        true
    }

    /// Offer a root route and report it when accepted.
    pub(crate) fn install_proactive_route(&mut self, entry: RouteEntry, now: Duration) -> bool {
        let change = route_change(RouteChangeKind::AddProactive, &entry, now);
        if !self.routes.add_or_update_proactive(entry, now).accepted() {
            self.stats.rejected_route_updates += 1;
            return false;
        }
        self.notify(ProtocolEvent::RouteChanged(change));
        true
    }

    pub(crate) fn report_removed(&mut self, kind: RouteChangeKind, entry: &RouteEntry, now: Duration) {
        self.notify(ProtocolEvent::RouteChanged(route_change(kind, entry, now)));
    }

    fn run_maintenance(&mut self, env: &mut dyn Environment) {
        let now = env.now();
        let expired = self.routes.expire(now);
        let mut failed = Vec::new();
        let mut receivers = Vec::new();
        for entry in &expired.reactive {
            self.report_removed(RouteChangeKind::DeleteReactive, entry, now);
            // Precursor expiries follow the route's own, so by now they have lapsed too.
            let precursors: Vec<_> = entry
                .recorded_precursors()
                .map(|p| (p.interface, p.address))
                .collect();
            if !precursors.is_empty() {
                failed.push(entry.failed_destination());
                receivers.extend(precursors);
            }
        }
        if let Some(root) = &expired.proactive {
            self.report_removed(RouteChangeKind::DeleteProactive, root, now);
        }
        let purged = self.prunes.purge_old_prunes(now);
        if !expired.reactive.is_empty() || expired.proactive.is_some() || purged > 0 {
            tracing::debug!(
                address = %self.address,
                expired = expired.reactive.len(),
                root_expired = expired.proactive.is_some(),
                prunes_purged = purged,
                "maintenance"
            );
        }
        if !failed.is_empty() {
            receivers.sort();
            receivers.dedup();
            self.initiate_path_error(
                PathError {
                    destinations: failed,
                    receivers,
                },
                env,
            );
        }
        self.maintenance_timer = Some(env.schedule(self.config.maintenance_interval, TimerEvent::Maintenance));
    }
}

fn route_change(kind: RouteChangeKind, entry: &RouteEntry, now: Duration) -> RouteChange {
    RouteChange {
        kind,
        destination: entry.destination,
        retransmitter: entry.retransmitter,
        interface: entry.interface,
        metric: entry.metric,
        lifetime: entry.remaining_lifetime(now),
        seqno: entry.seqno,
    }
}
