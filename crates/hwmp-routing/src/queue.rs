//! Packets waiting for route resolution.

use std::collections::VecDeque;
use std::fmt;

use hwmp_core::types::{InterfaceId, MacAddress};

use crate::protocol::reply::{DataPacket, Forwarded, RouteFailure, RouteReply};

/// A data packet parked until its destination resolves or fails.
pub struct QueuedPacket {
    pub packet: DataPacket,
    /// Interface the packet came in on; `None` for locally originated traffic.
    pub ingress: Option<InterfaceId>,
    reply: RouteReply,
}

impl QueuedPacket {
    pub fn new(packet: DataPacket, ingress: Option<InterfaceId>, reply: RouteReply) -> Self {
        Self {
            packet,
            ingress,
            reply,
        }
    }

    #[must_use]
    pub fn destination(&self) -> MacAddress {
        self.packet.destination
    }

    /// Report the packet as sent and consume it.
    pub fn complete(self, forwarded: Forwarded) {
        (self.reply)(Ok(forwarded));
    }

    /// Report a terminal failure and consume the packet.
    pub fn fail(self, reason: RouteFailure) {
        tracing::debug!(
            destination = %self.packet.destination,
            %reason,
            "queued packet failed"
        );
        (self.reply)(Err(reason));
    }
}

impl fmt::Debug for QueuedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedPacket")
            .field("packet", &self.packet)
            .field("ingress", &self.ingress)
            .finish_non_exhaustive()
    }
}

/// Bounded FIFO shared by all destinations.
#[derive(Debug)]
pub struct PendingPacketQueue {
    packets: VecDeque<QueuedPacket>,
    capacity: usize,
}

impl PendingPacketQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity,
        }
    }

    /// Append a packet.
    ///
    /// When the queue is full the oldest packet, whatever its destination,
    /// is evicted and failed with [`RouteFailure::QueueOverflow`] first.
    /// Returns `true` if an eviction happened.
    pub fn enqueue(&mut self, packet: QueuedPacket) -> bool {
        let mut evicted = false;
        while self.packets.len() >= self.capacity {
            match self.packets.pop_front() {
                Some(oldest) => {
                    tracing::warn!(
                        destination = %oldest.destination(),
                        capacity = self.capacity,
                        "pending queue full, evicting oldest packet"
                    );
                    oldest.fail(RouteFailure::QueueOverflow);
                    evicted = true;
                }
                None => break,
            }
        }
        self.packets.push_back(packet);
        evicted
    }

    /// Remove and return every packet for `destination`, oldest first.
    pub fn dequeue_all_for(&mut self, destination: &MacAddress) -> Vec<QueuedPacket> {
        let (matching, rest): (VecDeque<_>, VecDeque<_>) = self
            .packets
            .drain(..)
            .partition(|p| p.destination() == *destination);
        self.packets = rest;
        matching.into()
    }

    /// Remove every packet for `destination` and fail it. Returns how many.
    pub fn fail_all_for(&mut self, destination: &MacAddress, reason: RouteFailure) -> usize {
        let failed = self.dequeue_all_for(destination);
        let count = failed.len();
        for packet in failed {
            packet.fail(reason);
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The packet that would be evicted next.
    #[must_use]
    pub fn oldest(&self) -> Option<&QueuedPacket> {
        self.packets.front()
    }

    /// Number of packets waiting for `destination`.
    #[must_use]
    pub fn count_for(&self, destination: &MacAddress) -> usize {
        self.packets
            .iter()
            .filter(|p| p.destination() == *destination)
            .count()
    }
}
