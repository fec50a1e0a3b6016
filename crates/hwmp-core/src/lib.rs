//! Addresses, constants and wire formats for HWMP mesh path selection.
//!
//! This crate holds the protocol vocabulary shared by the routing engine
//! and the node: MAC addresses, sequence number arithmetic, the PREQ, PREP,
//! PERR and PRUNE information elements, the control frame envelope and the
//! mesh data header.

pub mod constants;
pub mod data;
pub mod element;
pub mod error;
pub mod frame;
pub mod types;

pub use data::MeshDataHeader;
pub use element::{
    FailedDestination, PerrElement, PrepElement, PreqDestination, PreqElement, PruneElement,
    PruneHeader, PruneUnit,
};
pub use error::ElementError;
pub use frame::ControlFrame;
pub use types::{InterfaceId, InvalidLength, MacAddress, seqno_newer};
