//! Outbound data packets and the continuation that reports their fate.

use hwmp_core::data::MeshDataHeader;
use hwmp_core::types::{InterfaceId, MacAddress};

/// A data packet handed to the protocol for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub source: MacAddress,
    pub destination: MacAddress,
    pub protocol: u16,
    pub payload: Vec<u8>,
}

/// Where a packet went: the egress interface, link receiver and the header
/// it was sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forwarded {
    pub interface: InterfaceId,
    pub receiver: MacAddress,
    pub header: MeshDataHeader,
}

/// Terminal failure reported to a packet's continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteFailure {
    #[error("destination unreachable")]
    DestinationUnreachable,

    #[error("pending queue overflow")]
    QueueOverflow,

    #[error("no route to destination")]
    NoRoute,
}

pub type RouteOutcome = Result<Forwarded, RouteFailure>;

/// Invoked exactly once per packet, when it is sent or given up on.
pub type RouteReply = Box<dyn FnOnce(RouteOutcome)>;
