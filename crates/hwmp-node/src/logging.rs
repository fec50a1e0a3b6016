//! Tracing subscriber configuration for mesh points.
//!
//! Log levels follow these conventions:
//! - WARN: Malformed or unexpected input that was dropped
//! - INFO: Path discovered, destination unreachable, root changes, link down
//! - DEBUG: Route table changes, PREQ/PREP/PERR/PRUNE sent and received
//! - TRACE: Per-frame duplicate and stale-sequence decisions

use tracing_subscriber::EnvFilter;

use crate::error::NodeError;

/// Initialize the tracing subscriber with sensible defaults.
///
/// Log level can be controlled via the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
}

/// Initialize the tracing subscriber from the `[logging]` level.
///
/// `RUST_LOG` still takes precedence when set. Fails on an unparsable
/// level or when a subscriber is already installed.
pub fn init_with_level(level: &str, json: bool) -> Result<(), NodeError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| NodeError::Config(format!("invalid log level '{level}': {e}")))?,
    };

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    result.map_err(|e| NodeError::Config(format!("failed to install subscriber: {e}")))
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
