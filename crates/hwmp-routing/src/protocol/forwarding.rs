//! Data forwarding.
//!
//! Unicast frames follow the route table, reactive route first. Group and
//! broadcast frames are flooded to every neighbor except the one they came
//! from and the ones that pruned this source. A duplicate group frame is
//! answered with a PRUNE to the neighbor that sent it.

use hwmp_core::constants::PRUNE_REASON_DUPLICATE;
use hwmp_core::data::MeshDataHeader;
use hwmp_core::element::{FailedDestination, PruneElement};
use hwmp_core::frame::ControlFrame;
use hwmp_core::types::{InterfaceId, MacAddress};

use super::env::{Environment, FrameKind};
use super::observer::{DropReason, ProtocolEvent};
use super::reply::{DataPacket, Forwarded, RouteFailure, RouteOutcome, RouteReply};
use super::HwmpProtocol;
use crate::discovery::state::plan_receivers;
use crate::error::RoutingError;
use crate::queue::QueuedPacket;
use crate::route::Precursor;

/// A data frame addressed to this node or to a group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub interface: InterfaceId,
    /// Neighbor the frame arrived from.
    pub from: MacAddress,
    pub header: MeshDataHeader,
    pub payload: Vec<u8>,
}

impl HwmpProtocol {
    /// Route a packet handed down by the local upper layer.
    ///
    /// `reply` runs exactly once: right away when a route or a group flood is
    /// possible, or later when discovery for the destination ends.
    pub fn request_route(&mut self, packet: DataPacket, reply: RouteReply, env: &mut dyn Environment) {
        let destination = packet.destination;
        if destination.is_broadcast() || destination.is_group() {
            let outcome = self.originate_group(&packet, env);
            reply(outcome);
            return;
        }
        if destination == self.address {
            tracing::debug!(address = %self.address, "packet addressed to this node is not routed");
            reply(Err(RouteFailure::NoRoute));
            return;
        }

        let now = env.now();
        if let Some(route) = self.route_to(&destination, now).lookup() {
            let header = self.local_header(&packet);
            let forwarded = self.send_data(header, &packet.payload, route.interface, route.retransmitter, env);
            reply(Ok(forwarded));
            return;
        }

        let evicted = if self.queue.len() >= self.queue.capacity() {
            self.queue.oldest().map(QueuedPacket::destination)
        } else {
            None
        };
        self.stats.total_queued += 1;
        if self.queue.enqueue(QueuedPacket::new(packet, None, reply)) {
            self.stats.queue_overflow += 1;
            self.stats.total_dropped += 1;
            if let Some(dropped) = evicted {
                self.notify(ProtocolEvent::PacketDropped {
                    destination: dropped,
                    reason: DropReason::QueueOverflow,
                });
            }
        }
        self.start_discovery(destination, env);
    }

    /// Handle a data frame received from neighbor `from` on `interface`.
    ///
    /// Returns the frame when it is for this node. Relaying happens inside.
    pub fn receive_data(
        &mut self,
        interface: InterfaceId,
        from: MacAddress,
        frame: &[u8],
        env: &mut dyn Environment,
    ) -> Result<Option<Delivery>, RoutingError> {
        if !self.interfaces.contains_key(&interface) {
            return Err(RoutingError::UnknownInterface(interface));
        }
        let (header, payload) = match MeshDataHeader::decode(frame) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.malformed_elements += 1;
                tracing::warn!(address = %self.address, %from, %interface, error = %e, "malformed data frame dropped");
                return Err(e.into());
            }
        };

        let duplicate = header.source == self.address
            || !self.sequences.accept_data_frame(header.seqno, header.source);
        if duplicate {
            self.stats.duplicate_frames += 1;
            tracing::trace!(
                address = %self.address,
                source = %header.source,
                seqno = header.seqno,
                %from,
                "duplicate data frame"
            );
            self.notify(ProtocolEvent::PacketDropped {
                destination: header.destination,
                reason: DropReason::DuplicateFrame,
            });
            if header.destination.is_group() {
                self.send_prune(from, interface, header.source, header.destination, env);
            }
            return Ok(None);
        }

        let delivery = Delivery {
            interface,
            from,
            header,
            payload: payload.to_vec(),
        };
        if header.destination.is_broadcast() || header.destination.is_group() {
            return Ok(self.receive_group(delivery, env));
        }
        if header.destination == self.address {
            return Ok(Some(delivery));
        }
        self.relay_unicast(delivery, env);
        Ok(None)
    }

    /// Send every packet queued for `destination` and close its discovery.
    pub(crate) fn reactive_path_resolved(&mut self, destination: MacAddress, env: &mut dyn Environment) {
        let now = env.now();
        if let Some(state) = self.discovery.finish(&destination) {
            state.timer.cancel(env);
            let elapsed = now.saturating_sub(state.started);
            tracing::info!(
                address = %self.address,
                %destination,
                elapsed_ms = elapsed.as_millis() as u64,
                retries = state.retry_count,
                "path discovered"
            );
            self.notify(ProtocolEvent::DiscoveryFinished {
                destination,
                elapsed,
                resolved: true,
            });
        }
        let Some(route) = self.routes.lookup_reactive(&destination, now) else {
            return;
        };
        for queued in self.queue.dequeue_all_for(&destination) {
            let header = self.local_header(&queued.packet);
            let forwarded = self.send_data(header, &queued.packet.payload, route.interface, route.retransmitter, env);
            queued.complete(forwarded);
        }
    }

    pub(crate) fn receive_prune(
        &mut self,
        prune: PruneElement,
        from: MacAddress,
        interface: InterfaceId,
        env: &mut dyn Environment,
    ) {
        let now = env.now();
        for unit in prune.units() {
            self.prunes.add_prune_entry(prune.originator, unit.address, now);
        }
        tracing::debug!(
            address = %self.address,
            %from,
            %interface,
            source = %prune.originator,
            group = %prune.group,
            units = prune.units().len(),
            "PRUNE received"
        );
        if prune.ttl <= 1 || prune.originator == self.address {
            return;
        }
        let Some(route) = self.routes.lookup_reactive(&prune.originator, now) else {
            return;
        };
        let mut relayed = prune;
        relayed.ttl -= 1;
        relayed.receiver = route.retransmitter;
        relayed.interface = route.interface;
        let frame = ControlFrame::Prune(relayed).encode();
        self.transmit(env, route.interface, route.retransmitter, FrameKind::Control, frame);
    }

    fn local_header(&mut self, packet: &DataPacket) -> MeshDataHeader {
        MeshDataHeader {
            ttl: self.config.max_ttl,
            seqno: self.next_data_seqno(),
            source: packet.source,
            destination: packet.destination,
            protocol: packet.protocol,
        }
    }

    fn send_data(
        &mut self,
        header: MeshDataHeader,
        payload: &[u8],
        interface: InterfaceId,
        receiver: MacAddress,
        env: &mut dyn Environment,
    ) -> Forwarded {
        self.transmit(env, interface, receiver, FrameKind::Data, header.encode(payload));
        Forwarded {
            interface,
            receiver,
            header,
        }
    }

    fn relay_unicast(&mut self, delivery: Delivery, env: &mut dyn Environment) {
        let Delivery {
            interface,
            from,
            mut header,
            payload,
        } = delivery;
        let destination = header.destination;
        if header.ttl <= 1 {
            self.stats.dropped_ttl += 1;
            self.drop_packet(destination, DropReason::TtlExpired);
            return;
        }
        header.ttl -= 1;

        let now = env.now();
        if let Some(route) = self.route_to(&destination, now).lookup() {
            self.routes.add_precursor(
                &destination,
                Precursor {
                    interface,
                    address: from,
                    expires: now + route.lifetime,
                },
            );
            self.send_data(header, &payload, route.interface, route.retransmitter, env);
            return;
        }

        tracing::debug!(address = %self.address, %destination, %from, "no route for relayed frame");
        self.drop_packet(destination, DropReason::NoRoute);
        let seqno = self
            .routes
            .reactive_entry(&destination)
            .map(|e| e.seqno)
            .or_else(|| self.sequences.control_record(&destination).map(|(s, _)| s))
            .unwrap_or(0)
            .wrapping_add(1);
        let mut error = self.make_path_error(vec![FailedDestination { destination, seqno }], now, |_, _| true);
        if !error.receivers.contains(&(interface, from)) {
            error.receivers.push((interface, from));
        }
        self.initiate_path_error(error, env);
    }

    fn receive_group(&mut self, delivery: Delivery, env: &mut dyn Environment) -> Option<Delivery> {
        let group = delivery.header.destination;
        let local = group.is_broadcast() || self.membership.is_member(&group, &self.address);
        if delivery.header.ttl <= 1 {
            self.stats.dropped_ttl += 1;
        } else {
            let mut relayed = delivery.header;
            relayed.ttl -= 1;
            self.flood_group(relayed, &delivery.payload, Some(delivery.from), env);
        }
        local.then_some(delivery)
    }

    fn originate_group(&mut self, packet: &DataPacket, env: &mut dyn Environment) -> RouteOutcome {
        let header = self.local_header(packet);
        match self.flood_group(header, &packet.payload, None, env) {
            Some(forwarded) => Ok(forwarded),
            None => {
                self.stats.total_dropped += 1;
                Err(RouteFailure::NoRoute)
            }
        }
    }

    /// Send a group frame on every interface. Returns the first transmission.
    ///
    /// Neighbors pruned for the frame's source never get it, so an interface
    /// with a pruned neighbor sends unicast copies instead of a broadcast.
    fn flood_group(
        &mut self,
        header: MeshDataHeader,
        payload: &[u8],
        exclude: Option<MacAddress>,
        env: &mut dyn Environment,
    ) -> Option<Forwarded> {
        let now = env.now();
        let frame = header.encode(payload);
        let interfaces: Vec<InterfaceId> = self.interfaces.keys().copied().collect();
        let mut first = None;
        let mut pruned = 0usize;
        for interface in interfaces {
            let mut targets = Vec::new();
            let mut pruned_here = 0usize;
            for neighbor in env.active_neighbors(interface) {
                if Some(neighbor) == exclude {
                    continue;
                }
                if self.prunes.is_pruned(header.source, neighbor, now) {
                    pruned_here += 1;
                } else {
                    targets.push(neighbor);
                }
            }
            pruned += pruned_here;
            let receivers = if pruned_here == 0 {
                plan_receivers(&targets, self.config.unicast_data_threshold)
            } else {
                targets
            };
            for receiver in receivers {
                self.transmit(env, interface, receiver, FrameKind::Data, frame.clone());
                first.get_or_insert(Forwarded {
                    interface,
                    receiver,
                    header,
                });
            }
        }
        if first.is_none() && pruned > 0 {
            self.stats.pruned_frames += 1;
            tracing::trace!(
                address = %self.address,
                source = %header.source,
                group = %header.destination,
                pruned,
                "group frame not relayed, all receivers pruned"
            );
            self.notify(ProtocolEvent::PacketDropped {
                destination: header.destination,
                reason: DropReason::Pruned,
            });
        }
        first
    }

    fn send_prune(
        &mut self,
        receiver: MacAddress,
        interface: InterfaceId,
        source: MacAddress,
        group: MacAddress,
        env: &mut dyn Environment,
    ) {
        let mut prune = PruneElement::new(receiver, interface, 1, group, source);
        prune.add_prune_unit(self.address, PRUNE_REASON_DUPLICATE);
        self.stats.initiated_prune += 1;
        tracing::debug!(address = %self.address, %receiver, %source, %group, "sending PRUNE");
        self.transmit(env, interface, receiver, FrameKind::Control, ControlFrame::Prune(prune).encode());
    }

    fn drop_packet(&mut self, destination: MacAddress, reason: DropReason) {
        self.stats.total_dropped += 1;
        self.notify(ProtocolEvent::PacketDropped { destination, reason });
    }
}
