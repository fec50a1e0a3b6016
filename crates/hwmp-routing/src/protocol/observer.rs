//! Observer hook for route changes and notable protocol outcomes.

use std::time::Duration;

use hwmp_core::types::{InterfaceId, MacAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChangeKind {
    AddReactive,
    DeleteReactive,
    AddProactive,
    DeleteProactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteChange {
    pub kind: RouteChangeKind,
    pub destination: MacAddress,
    pub retransmitter: MacAddress,
    pub interface: InterfaceId,
    pub metric: u32,
    pub lifetime: Duration,
    pub seqno: u32,
}

/// Why a data frame was not delivered or relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    DuplicateFrame,
    TtlExpired,
    NoRoute,
    QueueOverflow,
    DestinationUnreachable,
    Pruned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    RouteChanged(RouteChange),
    DiscoveryFinished {
        destination: MacAddress,
        elapsed: Duration,
        resolved: bool,
    },
    PacketDropped {
        destination: MacAddress,
        reason: DropReason,
    },
}

/// Receives every [`ProtocolEvent`]; registered once on the protocol.
pub trait ProtocolObserver {
    fn notify(&mut self, event: &ProtocolEvent);
}

impl<F: FnMut(&ProtocolEvent)> ProtocolObserver for F {
    fn notify(&mut self, event: &ProtocolEvent) {
        self(event);
    }
}
