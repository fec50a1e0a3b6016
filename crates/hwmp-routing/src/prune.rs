//! Multicast forwarding suppression.
//!
//! An entry `(source, destination)` means: do not relay group traffic from
//! `source` to the neighbor `destination` until the entry expires.

use std::collections::HashMap;
use std::time::Duration;

use hwmp_core::types::MacAddress;

#[derive(Debug, Clone)]
pub struct PruneTable {
    entries: HashMap<(MacAddress, MacAddress), Duration>,
    lifetime: Duration,
}

impl PruneTable {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lifetime,
        }
    }

    /// Insert or refresh `(source, destination)` until `now + lifetime`.
    pub fn add_prune_entry(&mut self, source: MacAddress, destination: MacAddress, now: Duration) {
        tracing::debug!(%source, %destination, "prune entry added");
        self.entries.insert((source, destination), now + self.lifetime);
    }

    /// Whether forwarding from `source` to `destination` is suppressed.
    ///
    /// Expired entries are purged first.
    pub fn is_pruned(&mut self, source: MacAddress, destination: MacAddress, now: Duration) -> bool {
        self.purge_old_prunes(now);
        self.entries.contains_key(&(source, destination))
    }

    /// Drop entries whose lifetime has passed. Returns how many were removed.
    pub fn purge_old_prunes(&mut self, now: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires| now <= *expires);
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
