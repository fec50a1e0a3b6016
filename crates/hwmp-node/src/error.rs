//! Error types for mesh point assembly.

use hwmp_routing::RoutingError;

/// Errors that can occur while configuring or starting a mesh point.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
