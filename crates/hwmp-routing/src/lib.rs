//! HWMP path selection for 802.11s-style mesh networks.
//!
//! This crate holds the per-node protocol state: reactive and proactive
//! route tables, path discovery, path error propagation, duplicate
//! suppression, the pending packet queue and multicast pruning. It is
//! event-driven and never blocks; the caller supplies time, timers,
//! neighbors and frame transmission through [`protocol::Environment`].

pub mod config;
pub mod dedup;
pub mod discovery;
pub mod error;
pub mod error_propagation;
pub mod protocol;
pub mod prune;
pub mod queue;
pub mod route;
pub mod testing;

pub use config::HwmpConfig;
pub use error::RoutingError;
pub use protocol::{
    DataPacket, Delivery, Environment, Forwarded, HwmpProtocol, MulticastMembership,
    ProtocolEvent, ProtocolObserver, RouteFailure, RouteOutcome, Statistics,
};
pub use route::RoutingTable;
