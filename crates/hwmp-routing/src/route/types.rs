//! Route table types.

use std::time::Duration;

use hwmp_core::element::FailedDestination;
use hwmp_core::types::{InterfaceId, MacAddress};

/// A neighbor that forwards through this node toward some destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precursor {
    pub interface: InterfaceId,
    pub address: MacAddress,
    /// Absolute time after which the precursor is forgotten.
    pub expires: Duration,
}

/// A route toward one destination, reactive or proactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: MacAddress,
    /// Next hop toward `destination`.
    pub retransmitter: MacAddress,
    pub interface: InterfaceId,
    /// Accumulated path cost; lower is better.
    pub metric: u32,
    /// Destination seqno as known when the route was learned.
    pub seqno: u32,
    /// Absolute expiry time.
    pub expires: Duration,
    precursors: Vec<Precursor>,
}

impl RouteEntry {
    pub fn new(
        destination: MacAddress,
        retransmitter: MacAddress,
        interface: InterfaceId,
        metric: u32,
        seqno: u32,
        expires: Duration,
    ) -> Self {
        Self {
            destination,
            retransmitter,
            interface,
            metric,
            seqno,
            expires,
            precursors: Vec::new(),
        }
    }

    /// Uses strict `>` comparison: `now > expires` means expired.
    #[must_use]
    pub fn is_expired(&self, now: Duration) -> bool {
        now > self.expires
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining_lifetime(&self, now: Duration) -> Duration {
        self.expires.saturating_sub(now)
    }

    /// Add or refresh a precursor.
    pub fn add_precursor(&mut self, precursor: Precursor) {
        match self
            .precursors
            .iter_mut()
            .find(|p| p.interface == precursor.interface && p.address == precursor.address)
        {
            Some(existing) => existing.expires = existing.expires.max(precursor.expires),
            None => self.precursors.push(precursor),
        }
    }

    /// Unexpired precursors.
    pub fn precursors(&self, now: Duration) -> impl Iterator<Item = &Precursor> {
        self.precursors.iter().filter(move |p| now <= p.expires)
    }

    /// Every precursor ever recorded, including lapsed ones.
    pub fn recorded_precursors(&self) -> impl Iterator<Item = &Precursor> {
        self.precursors.iter()
    }

    pub(crate) fn take_precursors(&mut self) -> Vec<Precursor> {
        std::mem::take(&mut self.precursors)
    }

    pub(crate) fn inherit_precursors(&mut self, precursors: Vec<Precursor>) {
        for p in precursors {
            self.add_precursor(p);
        }
    }

    /// The destination as reported in a path error: last known seqno plus one.
    #[must_use]
    pub fn failed_destination(&self) -> FailedDestination {
        FailedDestination {
            destination: self.destination,
            seqno: self.seqno.wrapping_add(1),
        }
    }

    #[must_use]
    pub fn lookup(&self, now: Duration) -> RouteLookup {
        RouteLookup {
            retransmitter: self.retransmitter,
            interface: self.interface,
            metric: self.metric,
            seqno: self.seqno,
            lifetime: self.remaining_lifetime(now),
        }
    }
}

/// Snapshot of a route returned by lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteLookup {
    pub retransmitter: MacAddress,
    pub interface: InterfaceId,
    pub metric: u32,
    pub seqno: u32,
    pub lifetime: Duration,
}

/// Outcome of offering a route to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteUpdate {
    Inserted,
    Replaced,
    Rejected,
}

impl RouteUpdate {
    #[must_use]
    pub fn accepted(self) -> bool {
        !matches!(self, RouteUpdate::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(expires_ms: u64) -> RouteEntry {
        RouteEntry::new(
            MacAddress::from_index(4),
            MacAddress::from_index(2),
            InterfaceId(0),
            100,
            7,
            Duration::from_millis(expires_ms),
        )
    }

    #[test]
    fn test_expiry_is_strict() {
        let e = entry(1000);
        assert!(!e.is_expired(Duration::from_millis(1000)));
        assert!(e.is_expired(Duration::from_millis(1001)));
        assert_eq!(e.remaining_lifetime(Duration::from_millis(2000)), Duration::ZERO);
    }

    #[test]
    fn test_precursor_refresh_keeps_later_expiry() {
        let mut e = entry(1000);
        let p = Precursor {
            interface: InterfaceId(0),
            address: MacAddress::from_index(9),
            expires: Duration::from_millis(500),
        };
        e.add_precursor(p);
        e.add_precursor(Precursor {
            expires: Duration::from_millis(900),
            ..p
        });
        e.add_precursor(Precursor {
            expires: Duration::from_millis(100),
            ..p
        });
        let live: Vec<_> = e.precursors(Duration::from_millis(600)).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].expires, Duration::from_millis(900));
        assert_eq!(e.precursors(Duration::from_millis(901)).count(), 0);
        assert_eq!(e.recorded_precursors().count(), 1);
    }

    #[test]
    fn test_failed_destination_bumps_seqno() {
        let mut e = entry(1000);
        assert_eq!(e.failed_destination().seqno, 8);
        e.seqno = u32::MAX;
        assert_eq!(e.failed_destination().seqno, 0);
    }
}
