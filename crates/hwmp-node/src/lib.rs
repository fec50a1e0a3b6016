//! Configuration and assembly of a single HWMP mesh point.
//!
//! This crate loads a node's TOML configuration, sets up logging, and builds
//! the protocol instance with its interfaces and multicast groups.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{MeshNode, NodeSummary};
