//! Route table: one reactive entry per destination plus the root path.

use std::collections::HashMap;
use std::time::Duration;

use hwmp_core::element::FailedDestination;
use hwmp_core::types::MacAddress;

use super::decision::is_fresher;
use super::types::{Precursor, RouteEntry, RouteLookup, RouteUpdate};

/// Entries removed by [`RoutingTable::expire`].
#[derive(Debug, Default)]
pub struct ExpiredRoutes {
    pub reactive: Vec<RouteEntry>,
    pub proactive: Option<RouteEntry>,
}

/// Reactive routes keyed by destination, and at most one proactive route.
#[must_use]
#[derive(Debug, Default)]
pub struct RoutingTable {
    reactive: HashMap<MacAddress, RouteEntry>,
    proactive: Option<RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unexpired reactive route toward `destination`.
    #[must_use]
    pub fn lookup_reactive(&self, destination: &MacAddress, now: Duration) -> Option<RouteLookup> {
        self.reactive
            .get(destination)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.lookup(now))
    }

    /// Reactive entry regardless of expiry.
    #[must_use]
    pub fn reactive_entry(&self, destination: &MacAddress) -> Option<&RouteEntry> {
        self.reactive.get(destination)
    }

    /// Unexpired route toward the root.
    #[must_use]
    pub fn lookup_proactive(&self, now: Duration) -> Option<RouteLookup> {
        self.proactive
            .as_ref()
            .filter(|e| !e.is_expired(now))
            .map(|e| e.lookup(now))
    }

    #[must_use]
    pub fn proactive_entry(&self) -> Option<&RouteEntry> {
        self.proactive.as_ref()
    }

    /// Address of the currently known root, if any.
    #[must_use]
    pub fn root(&self) -> Option<MacAddress> {
        self.proactive.as_ref().map(|e| e.destination)
    }

    /// Offer a reactive route.
    ///
    /// Accepted when no entry exists for the destination, when the seqno is
    /// newer than the stored one, or when the seqno is equal and the metric
    /// strictly lower. Precursors of a replaced entry carry over.
    pub fn add_or_update(&mut self, mut entry: RouteEntry) -> RouteUpdate {
        match self.reactive.get_mut(&entry.destination) {
            None => {
                tracing::debug!(
                    destination = %entry.destination,
                    retransmitter = %entry.retransmitter,
                    metric = entry.metric,
                    seqno = entry.seqno,
                    "reactive route added"
                );
                self.reactive.insert(entry.destination, entry);
                RouteUpdate::Inserted
            }
            Some(existing) => {
                if !is_fresher(Some((existing.seqno, existing.metric)), entry.seqno, entry.metric) {
                    return RouteUpdate::Rejected;
                }
                tracing::debug!(
                    destination = %entry.destination,
                    retransmitter = %entry.retransmitter,
                    metric = entry.metric,
                    seqno = entry.seqno,
                    "reactive route replaced"
                );
                entry.inherit_precursors(existing.take_precursors());
                *existing = entry;
                RouteUpdate::Replaced
            }
        }
    }

    /// Offer a route toward a root.
    ///
    /// Updates from the current root follow the reactive freshness rule. A
    /// different root takes over only once the current root path has expired
    /// or when it offers a strictly lower metric.
    pub fn add_or_update_proactive(&mut self, entry: RouteEntry, now: Duration) -> RouteUpdate {
        let accept = match &self.proactive {
            None => true,
            Some(existing) if existing.destination == entry.destination => {
                is_fresher(Some((existing.seqno, existing.metric)), entry.seqno, entry.metric)
            }
            Some(existing) => existing.is_expired(now) || entry.metric < existing.metric,
        };
        if !accept {
            return RouteUpdate::Rejected;
        }
        tracing::debug!(
            root = %entry.destination,
            retransmitter = %entry.retransmitter,
            metric = entry.metric,
            seqno = entry.seqno,
            "proactive route updated"
        );
        match self.proactive.replace(entry) {
            None => RouteUpdate::Inserted,
            Some(_) => RouteUpdate::Replaced,
        }
    }

    /// Record that `precursor` forwards through this node toward `destination`.
    ///
    /// Returns `false` if there is no reactive entry for the destination.
    pub fn add_precursor(&mut self, destination: &MacAddress, precursor: Precursor) -> bool {
        match self.reactive.get_mut(destination) {
            Some(entry) => {
                entry.add_precursor(precursor);
                true
            }
            None => false,
        }
    }

    /// Unexpired precursors of the reactive route toward `destination`.
    #[must_use]
    pub fn precursors(&self, destination: &MacAddress, now: Duration) -> Vec<Precursor> {
        self.reactive
            .get(destination)
            .map(|e| e.precursors(now).copied().collect())
            .unwrap_or_default()
    }

    /// Remove the reactive route toward `destination`.
    pub fn invalidate(&mut self, destination: &MacAddress) -> Option<RouteEntry> {
        let removed = self.reactive.remove(destination);
        if removed.is_some() {
            tracing::debug!(%destination, "reactive route invalidated");
        }
        removed
    }

    /// Remove the proactive route.
    pub fn invalidate_proactive(&mut self) -> Option<RouteEntry> {
        self.proactive.take()
    }

    /// Remove every expired entry, reactive and proactive, and return them.
    pub fn expire(&mut self, now: Duration) -> ExpiredRoutes {
        let expired: Vec<MacAddress> = self
            .reactive
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(d, _)| *d)
            .collect();
        let reactive = expired
            .iter()
            .filter_map(|d| self.reactive.remove(d))
            .collect();
        let proactive = if self.proactive.as_ref().is_some_and(|e| e.is_expired(now)) {
            self.proactive.take()
        } else {
            None
        };
        ExpiredRoutes {
            reactive,
            proactive,
        }
    }

    /// Destinations whose next hop is `peer`, reported with seqno plus one.
    #[must_use]
    pub fn unreachable_via(&self, peer: &MacAddress) -> Vec<FailedDestination> {
        let mut failed: Vec<FailedDestination> = self
            .reactive
            .values()
            .filter(|e| e.retransmitter == *peer)
            .map(RouteEntry::failed_destination)
            .collect();
        if let Some(root) = self.proactive.as_ref().filter(|e| e.retransmitter == *peer) {
            failed.push(root.failed_destination());
        }
        failed
    }

    /// Number of reactive entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reactive.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reactive.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MacAddress, &RouteEntry)> {
        self.reactive.iter()
    }
}
