//! Path error propagation.
//!
//! When destinations become unreachable their routes are removed and every
//! neighbor recorded as a precursor of those routes is told with a PERR.
//! A PERR is only acted on by a node whose own route to the destination
//! goes through the sender, so invalidation cascades upstream along the
//! paths that actually used the broken hop.

use std::collections::BTreeMap;
use std::time::Duration;

use hwmp_core::element::{FailedDestination, PerrElement};
use hwmp_core::frame::ControlFrame;
use hwmp_core::types::{InterfaceId, MacAddress, seqno_newer};

use crate::protocol::HwmpProtocol;
use crate::protocol::env::{Environment, FrameKind, TimerEvent};
use crate::protocol::interface::hold_off;
use crate::protocol::observer::RouteChangeKind;
use crate::route::RouteEntry;

/// Unreachable destinations and the neighbors that must hear about them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathError {
    pub destinations: Vec<FailedDestination>,
    pub receivers: Vec<(InterfaceId, MacAddress)>,
}

/// Link receivers per interface for a PERR.
///
/// Up to `threshold` receivers in total get one unicast copy each. Above
/// that, each interface with at least one receiver gets a single broadcast.
#[must_use]
pub fn plan_perr_receivers(
    receivers: &[(InterfaceId, MacAddress)],
    threshold: usize,
) -> BTreeMap<InterfaceId, Vec<MacAddress>> {
    let mut plan: BTreeMap<InterfaceId, Vec<MacAddress>> = BTreeMap::new();
    let broadcast = receivers.len() > threshold;
    for (interface, address) in receivers {
        let list = plan.entry(*interface).or_default();
        if broadcast {
            if list.is_empty() {
                list.push(MacAddress::BROADCAST);
            }
        } else if !list.contains(address) {
            list.push(*address);
        }
    }
    plan
}

/// Whether a PERR from `from` on `interface` for `failed` applies to `entry`.
#[must_use]
pub fn perr_applies(entry: &RouteEntry, failed: &FailedDestination, from: MacAddress, interface: InterfaceId) -> bool {
    entry.retransmitter == from && entry.interface == interface && !seqno_newer(entry.seqno, failed.seqno)
}

impl HwmpProtocol {
    /// Remove the routes to `failed` selected by `applies` and collect the
    /// precursors of the reactive ones removed.
    pub(crate) fn make_path_error(
        &mut self,
        failed: Vec<FailedDestination>,
        now: Duration,
        applies: impl Fn(&RouteEntry, &FailedDestination) -> bool,
    ) -> PathError {
        let mut error = PathError::default();
        for dst in failed {
            if self
                .routes
                .reactive_entry(&dst.destination)
                .is_some_and(|e| applies(e, &dst))
            {
                for p in self.routes.precursors(&dst.destination, now) {
                    if !error.receivers.contains(&(p.interface, p.address)) {
                        error.receivers.push((p.interface, p.address));
                    }
                }
                if let Some(entry) = self.routes.invalidate(&dst.destination) {
                    self.report_removed(RouteChangeKind::DeleteReactive, &entry, now);
                }
            }
            if self
                .routes
                .proactive_entry()
                .is_some_and(|e| e.destination == dst.destination && applies(e, &dst))
                && let Some(entry) = self.routes.invalidate_proactive()
            {
                self.report_removed(RouteChangeKind::DeleteProactive, &entry, now);
            }
            if !error.destinations.iter().any(|d| d.destination == dst.destination) {
                error.destinations.push(dst);
            }
        }
        error
    }

    /// Send a PERR originated by this node.
    pub(crate) fn initiate_path_error(&mut self, error: PathError, env: &mut dyn Environment) {
        if error.destinations.is_empty() || error.receivers.is_empty() {
            return;
        }
        self.stats.initiated_perr += 1;
        tracing::debug!(
            address = %self.address,
            destinations = error.destinations.len(),
            receivers = error.receivers.len(),
            "initiating PERR"
        );
        let ttl = self.config.max_ttl;
        self.send_path_error(error, ttl, env);
    }

    pub(crate) fn receive_perr(
        &mut self,
        perr: PerrElement,
        from: MacAddress,
        interface: InterfaceId,
        env: &mut dyn Environment,
    ) {
        if perr.ttl == 0 {
            self.stats.dropped_ttl += 1;
            return;
        }
        let accepted: Vec<FailedDestination> = perr
            .destinations
            .iter()
            .filter(|failed| {
                let reactive = self.routes.reactive_entry(&failed.destination);
                let root = self
                    .routes
                    .proactive_entry()
                    .filter(|e| e.destination == failed.destination);
                reactive
                    .into_iter()
                    .chain(root)
                    .any(|e| perr_applies(e, failed, from, interface))
            })
            .copied()
            .collect();
        tracing::debug!(
            address = %self.address,
            %from,
            %interface,
            listed = perr.destinations.len(),
            accepted = accepted.len(),
            "PERR received"
        );
        if accepted.is_empty() {
            return;
        }
        let now = env.now();
        let error = self.make_path_error(accepted, now, |entry, failed| {
            perr_applies(entry, failed, from, interface)
        });
        if perr.ttl > 1 {
            self.send_path_error(error, perr.ttl - 1, env);
        }
    }

    fn send_path_error(&mut self, error: PathError, ttl: u8, env: &mut dyn Environment) {
        if error.destinations.is_empty() {
            return;
        }
        let now = env.now();
        let min_interval = self.config.perr_min_interval;
        let plan = plan_perr_receivers(&error.receivers, self.config.unicast_perr_threshold);
        for (interface, receivers) in plan {
            let Some(state) = self.interfaces.get_mut(&interface) else {
                continue;
            };
            state.queue_perr(&error.destinations, receivers, ttl);
            if state.perr_timer.is_some() {
                continue;
            }
            match hold_off(state.last_perr, now, min_interval) {
                None => self.flush_perrs(interface, env),
                Some(delay) => {
                    state.perr_timer = Some(env.schedule(delay, TimerEvent::FlushPerr { interface }));
                }
            }
        }
    }

    pub(crate) fn flush_perrs(&mut self, interface: InterfaceId, env: &mut dyn Environment) {
        let now = env.now();
        let Some(state) = self.interfaces.get_mut(&interface) else {
            return;
        };
        state.perr_timer = None;
        let pending = std::mem::take(&mut state.pending_perrs);
        if pending.is_empty() {
            return;
        }
        state.last_perr = Some(now);
        for perr in pending {
            let frame = ControlFrame::Perr(perr.element).encode();
            for receiver in perr.receivers {
                self.transmit(env, interface, receiver, FrameKind::Control, frame.clone());
            }
        }
    }
}
