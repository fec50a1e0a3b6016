//! Path discovery: PREQ origination and retries, PREQ/PREP handling, and
//! root announcements.

pub mod state;

use std::time::Duration;

use hwmp_core::element::preq::PREQ_FLAG_NO_PREP;
use hwmp_core::element::{PrepElement, PreqDestination, PreqElement};
use hwmp_core::frame::ControlFrame;
use hwmp_core::types::{InterfaceId, MacAddress};

use crate::config::{duration_to_tu, tu_to_duration};
use crate::protocol::env::{Environment, FrameKind, TimerEvent};
use crate::protocol::interface::hold_off;
use crate::protocol::observer::{DropReason, ProtocolEvent};
use crate::protocol::reply::RouteFailure;
use crate::protocol::HwmpProtocol;
use crate::route::decision::can_reply_from_cache;
use crate::route::{Precursor, RouteEntry};
use state::{DiscoveryState, plan_receivers, retry_delay};

impl HwmpProtocol {
    /// Begin discovery toward `destination` unless one is already running.
    pub(crate) fn start_discovery(&mut self, destination: MacAddress, env: &mut dyn Environment) {
        if self.discovery.in_flight(&destination) {
            tracing::trace!(address = %self.address, %destination, "discovery already in flight");
            return;
        }
        let now = env.now();
        self.originate_preq(destination, env);
        let delay = retry_delay(0, self.config.net_diameter_traversal_time, self.config.max_retry_interval);
        let timer = env.schedule(
            delay,
            TimerEvent::PreqRetry {
                destination,
                attempt: 0,
            },
        );
        self.discovery.start(
            destination,
            DiscoveryState {
                retry_count: 0,
                started: now,
                last_sent: now,
                timer,
            },
        );
    }

    /// Discovery timeout for `destination`.
    ///
    /// `attempt` must match the current retry count; anything else is a
    /// timer that outlived its discovery.
    pub(crate) fn retry_discovery(&mut self, destination: MacAddress, attempt: u8, env: &mut dyn Environment) {
        let Some(state) = self.discovery.get(&destination).copied() else {
            return;
        };
        if state.retry_count != attempt {
            return;
        }
        let now = env.now();
        if self.routes.lookup_reactive(&destination, now).is_some() {
            self.reactive_path_resolved(destination, env);
            return;
        }

        if state.retry_count >= self.config.max_preq_retries {
            self.discovery.finish(&destination);
            let failed = self.queue.fail_all_for(&destination, RouteFailure::DestinationUnreachable);
            self.stats.total_dropped += failed as u64;
            let elapsed = now.saturating_sub(state.started);
            tracing::info!(
                address = %self.address,
                %destination,
                retries = state.retry_count,
                dropped = failed,
                "destination unreachable"
            );
            self.notify(ProtocolEvent::DiscoveryFinished {
                destination,
                elapsed,
                resolved: false,
            });
            for _ in 0..failed {
                self.notify(ProtocolEvent::PacketDropped {
                    destination,
                    reason: DropReason::DestinationUnreachable,
                });
            }
            return;
        }

        let retry_count = state.retry_count + 1;
        tracing::debug!(address = %self.address, %destination, retry = retry_count, "retrying path discovery");
        self.originate_preq(destination, env);
        let delay = retry_delay(
            retry_count,
            self.config.net_diameter_traversal_time,
            self.config.max_retry_interval,
        );
        let timer = env.schedule(
            delay,
            TimerEvent::PreqRetry {
                destination,
                attempt: retry_count,
            },
        );
        if let Some(state) = self.discovery.get_mut(&destination) {
            state.retry_count = retry_count;
            state.last_sent = now;
            state.timer = timer;
        }
    }

    /// Send a fresh PREQ for `destination`: new seqno, zero metric, full TTL.
    fn originate_preq(&mut self, destination: MacAddress, env: &mut dyn Environment) {
        let known = self.sequences.control_record(&destination).map(|(seqno, _)| seqno);
        let preq = PreqElement {
            flags: 0,
            hop_count: 0,
            ttl: self.config.max_ttl,
            preq_id: self.next_preq_id(),
            originator: self.address,
            originator_seqno: self.next_hwmp_seqno(),
            lifetime: self.config.active_path_lifetime_tu(),
            metric: 0,
            destinations: vec![PreqDestination {
                destination_only: self.config.do_flag,
                reply_and_forward: self.config.rf_flag,
                unknown_seqno: known.is_none(),
                address: destination,
                seqno: known.unwrap_or(0),
            }],
        };
        self.stats.initiated_preq += 1;
        tracing::debug!(
            address = %self.address,
            %destination,
            seqno = preq.originator_seqno,
            preq_id = preq.preq_id,
            "originating PREQ"
        );
        self.send_preq(preq, env);
    }

    /// Root announcement, re-armed every `path_to_root_interval`.
    pub(crate) fn send_proactive_preq(&mut self, env: &mut dyn Environment) {
        if !self.is_root {
            return;
        }
        let preq = PreqElement {
            flags: if self.config.root_requests_prep { 0 } else { PREQ_FLAG_NO_PREP },
            hop_count: 0,
            ttl: self.config.max_ttl,
            preq_id: self.next_preq_id(),
            originator: self.address,
            originator_seqno: self.next_hwmp_seqno(),
            lifetime: self.config.active_root_lifetime_tu(),
            metric: 0,
            destinations: vec![PreqDestination {
                destination_only: true,
                reply_and_forward: true,
                unknown_seqno: false,
                address: MacAddress::BROADCAST,
                seqno: 0,
            }],
        };
        self.stats.initiated_preq += 1;
        tracing::debug!(address = %self.address, seqno = preq.originator_seqno, "root announcement");
        self.send_preq(preq, env);
        self.proactive_timer = Some(env.schedule(self.config.path_to_root_interval, TimerEvent::ProactivePreq));
    }

    pub(crate) fn receive_preq(
        &mut self,
        mut preq: PreqElement,
        from: MacAddress,
        interface: InterfaceId,
        link_metric: u32,
        env: &mut dyn Environment,
    ) {
        preq.increment_metric(link_metric);
        if preq.originator == self.address {
            return;
        }
        if preq.ttl == 0 {
            self.stats.dropped_ttl += 1;
            return;
        }
        preq.ttl -= 1;
        if !self
            .sequences
            .accept_control(preq.originator, preq.originator_seqno, preq.metric)
        {
            self.stats.stale_sequence += 1;
            return;
        }
        tracing::debug!(
            address = %self.address,
            originator = %preq.originator,
            seqno = preq.originator_seqno,
            metric = preq.metric,
            %from,
            "PREQ received"
        );

        let now = env.now();
        let lifetime = tu_to_duration(preq.lifetime);
        let reverse = RouteEntry::new(
            preq.originator,
            from,
            interface,
            preq.metric,
            preq.originator_seqno,
            now + lifetime,
        );
        if self.install_route(reverse.clone(), now) {
            self.reactive_path_resolved(preq.originator, env);
        }

        if preq.is_proactive() {
            self.install_proactive_route(reverse, now);
            if !preq.need_not_prep() {
                let prep = PrepElement {
                    flags: 0,
                    hop_count: 0,
                    ttl: self.config.max_ttl,
                    destination: preq.originator,
                    destination_seqno: preq.originator_seqno,
                    lifetime: preq.lifetime,
                    metric: 0,
                    originator: self.address,
                    originator_seqno: self.next_hwmp_seqno(),
                };
                self.stats.initiated_prep += 1;
                self.send_prep(prep, from, interface, env);
            }
        } else {
            self.answer_destinations(&mut preq, from, interface, now, lifetime, env);
        }

        if preq.destinations.is_empty() || preq.ttl == 0 {
            return;
        }
        self.send_preq(preq, env);
    }

    /// Reply to every destination this node can answer for, and strip or
    /// re-flag those units in the PREQ that will be forwarded.
    fn answer_destinations(
        &mut self,
        preq: &mut PreqElement,
        from: MacAddress,
        interface: InterfaceId,
        now: Duration,
        lifetime: Duration,
        env: &mut dyn Environment,
    ) {
        for dest in preq.destinations.clone() {
            if dest.address == self.address {
                let prep = PrepElement {
                    flags: 0,
                    hop_count: 0,
                    ttl: self.config.max_ttl,
                    destination: preq.originator,
                    destination_seqno: preq.originator_seqno,
                    lifetime: preq.lifetime,
                    metric: 0,
                    originator: self.address,
                    originator_seqno: self.next_hwmp_seqno(),
                };
                self.stats.initiated_prep += 1;
                self.send_prep(prep, from, interface, env);
                preq.remove_destination(&dest.address);
                continue;
            }
            if dest.destination_only {
                continue;
            }
            let Some(cached) = self.routes.lookup_reactive(&dest.address, now) else {
                continue;
            };
            if !can_reply_from_cache(cached.seqno, dest.seqno, dest.unknown_seqno) {
                continue;
            }

            self.routes.add_precursor(
                &dest.address,
                Precursor {
                    interface,
                    address: from,
                    expires: now + lifetime,
                },
            );
            self.routes.add_precursor(
                &preq.originator,
                Precursor {
                    interface: cached.interface,
                    address: cached.retransmitter,
                    expires: now + cached.lifetime,
                },
            );
            let prep = PrepElement {
                flags: 0,
                hop_count: 0,
                ttl: self.config.max_ttl,
                destination: preq.originator,
                destination_seqno: preq.originator_seqno,
                lifetime: duration_to_tu(cached.lifetime),
                metric: cached.metric,
                originator: dest.address,
                originator_seqno: cached.seqno,
            };
            tracing::debug!(
                address = %self.address,
                destination = %dest.address,
                originator = %preq.originator,
                "answering PREQ from route cache"
            );
            self.stats.initiated_prep += 1;
            self.send_prep(prep, from, interface, env);

            if dest.reply_and_forward {
                preq.add_destination(PreqDestination {
                    destination_only: true,
                    reply_and_forward: false,
                    ..dest
                });
            } else {
                preq.remove_destination(&dest.address);
            }
        }
    }

    pub(crate) fn receive_prep(
        &mut self,
        mut prep: PrepElement,
        from: MacAddress,
        interface: InterfaceId,
        link_metric: u32,
        env: &mut dyn Environment,
    ) {
        prep.increment_metric(link_metric);
        if prep.originator == self.address {
            return;
        }
        if prep.ttl == 0 {
            self.stats.dropped_ttl += 1;
            return;
        }
        prep.ttl -= 1;
        if !self
            .sequences
            .accept_control(prep.originator, prep.originator_seqno, prep.metric)
        {
            self.stats.stale_sequence += 1;
            return;
        }
        tracing::debug!(
            address = %self.address,
            originator = %prep.originator,
            destination = %prep.destination,
            seqno = prep.originator_seqno,
            metric = prep.metric,
            %from,
            "PREP received"
        );

        let now = env.now();
        let forward = RouteEntry::new(
            prep.originator,
            from,
            interface,
            prep.metric,
            prep.originator_seqno,
            now + tu_to_duration(prep.lifetime),
        );
        if self.install_route(forward, now) {
            self.reactive_path_resolved(prep.originator, env);
        }
        if prep.destination == self.address {
            return;
        }

        let Some(reverse) = self.routes.lookup_reactive(&prep.destination, now) else {
            tracing::debug!(address = %self.address, destination = %prep.destination, "no reverse route for PREP");
            return;
        };
        self.routes.add_precursor(
            &prep.destination,
            Precursor {
                interface,
                address: from,
                expires: now + tu_to_duration(prep.lifetime),
            },
        );
        self.routes.add_precursor(
            &prep.originator,
            Precursor {
                interface: reverse.interface,
                address: reverse.retransmitter,
                expires: now + reverse.lifetime,
            },
        );
        if prep.ttl == 0 {
            return;
        }
        self.send_prep(prep, reverse.retransmitter, reverse.interface, env);
    }

    fn send_prep(
        &mut self,
        prep: PrepElement,
        receiver: MacAddress,
        interface: InterfaceId,
        env: &mut dyn Environment,
    ) {
        tracing::debug!(
            address = %self.address,
            %receiver,
            originator = %prep.originator,
            destination = %prep.destination,
            "sending PREP"
        );
        let frame = ControlFrame::Prep(prep).encode();
        self.transmit(env, interface, receiver, FrameKind::Control, frame);
    }

    /// Queue `preq` on every interface and flush those that are not held off.
    pub(crate) fn send_preq(&mut self, preq: PreqElement, env: &mut dyn Environment) {
        let now = env.now();
        let min_interval = self.config.preq_min_interval;
        let interfaces: Vec<InterfaceId> = self.interfaces.keys().copied().collect();
        for interface in interfaces {
            let Some(state) = self.interfaces.get_mut(&interface) else {
                continue;
            };
            state.queue_preq(preq.clone());
            if state.preq_timer.is_some() {
                continue;
            }
            match hold_off(state.last_preq, now, min_interval) {
                None => self.flush_preqs(interface, env),
                Some(delay) => {
                    state.preq_timer = Some(env.schedule(delay, TimerEvent::FlushPreq { interface }));
                }
            }
        }
    }

    pub(crate) fn flush_preqs(&mut self, interface: InterfaceId, env: &mut dyn Environment) {
        let now = env.now();
        let Some(state) = self.interfaces.get_mut(&interface) else {
            return;
        };
        state.preq_timer = None;
        let pending = std::mem::take(&mut state.pending_preqs);
        if pending.is_empty() {
            return;
        }
        state.last_preq = Some(now);
        let receivers = plan_receivers(&env.active_neighbors(interface), self.config.unicast_preq_threshold);
        for preq in pending {
            let frame = ControlFrame::Preq(preq).encode();
            for receiver in &receivers {
                self.transmit(env, interface, *receiver, FrameKind::Control, frame.clone());
            }
        }
    }
}
