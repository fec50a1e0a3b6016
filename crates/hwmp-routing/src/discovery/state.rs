//! Per-destination discovery bookkeeping and the pure timing/receiver rules.

use std::collections::HashMap;
use std::time::Duration;

use hwmp_core::types::MacAddress;

use crate::protocol::env::TimerHandle;

/// A discovery in flight toward one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryState {
    /// Retries sent so far; zero while waiting on the first PREQ.
    pub retry_count: u8,
    pub started: Duration,
    pub last_sent: Duration,
    pub timer: TimerHandle,
}

/// Destinations with a discovery in flight.
#[derive(Debug, Default)]
#[must_use]
pub struct DiscoveryTable {
    pending: HashMap<MacAddress, DiscoveryState>,
}

impl DiscoveryTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn in_flight(&self, destination: &MacAddress) -> bool {
        self.pending.contains_key(destination)
    }

    #[must_use]
    pub fn get(&self, destination: &MacAddress) -> Option<&DiscoveryState> {
        self.pending.get(destination)
    }

    pub fn get_mut(&mut self, destination: &MacAddress) -> Option<&mut DiscoveryState> {
        self.pending.get_mut(destination)
    }

    pub fn start(&mut self, destination: MacAddress, state: DiscoveryState) {
        self.pending.insert(destination, state);
    }

    /// Forget the discovery, handing back its state so the timer can be cancelled.
    pub fn finish(&mut self, destination: &MacAddress) -> Option<DiscoveryState> {
        self.pending.remove(destination)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Delay before the timeout that follows the PREQ numbered `retry_count`.
///
/// `2 × traversal` after the first PREQ, doubling after each retry, never
/// more than `max`.
#[must_use]
pub fn retry_delay(retry_count: u8, traversal: Duration, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(u32::from(retry_count) + 1).unwrap_or(u32::MAX);
    traversal.checked_mul(factor).unwrap_or(max).min(max)
}

/// Link receivers for a flooded frame on one interface.
///
/// Broadcast once when the neighbor count exceeds `threshold`, otherwise one
/// unicast copy per neighbor. No neighbors means nothing is sent.
#[must_use]
pub fn plan_receivers(neighbors: &[MacAddress], threshold: usize) -> Vec<MacAddress> {
    if neighbors.len() > threshold {
        vec![MacAddress::BROADCAST]
    } else {
        neighbors.to_vec()
    }
}
