//! Pure functions for route freshness and selection decisions.

use hwmp_core::types::seqno_newer;

use super::types::RouteLookup;

/// Whether `(seqno, metric)` is fresher than the stored record.
///
/// Fresher information always wins; among equally fresh information the
/// lower metric wins. With no stored record anything is fresh.
#[must_use]
pub fn is_fresher(stored: Option<(u32, u32)>, seqno: u32, metric: u32) -> bool {
    match stored {
        None => true,
        Some((stored_seqno, stored_metric)) => {
            seqno_newer(seqno, stored_seqno) || (seqno == stored_seqno && metric < stored_metric)
        }
    }
}

/// Which route a forwarding decision should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChoice {
    Reactive(RouteLookup),
    Proactive(RouteLookup),
    None,
}

impl RouteChoice {
    #[must_use]
    pub fn lookup(self) -> Option<RouteLookup> {
        match self {
            RouteChoice::Reactive(r) | RouteChoice::Proactive(r) => Some(r),
            RouteChoice::None => None,
        }
    }
}

/// Pick between an unexpired reactive route and the proactive root route.
///
/// The reactive route is preferred whenever one exists.
#[must_use]
pub fn choose_route(reactive: Option<RouteLookup>, proactive: Option<RouteLookup>) -> RouteChoice {
    match (reactive, proactive) {
        (Some(r), _) => RouteChoice::Reactive(r),
        (None, Some(p)) => RouteChoice::Proactive(p),
        (None, None) => RouteChoice::None,
    }
}

/// Whether a cached route may answer a PREQ on the destination's behalf.
///
/// The cached seqno must not be older than the requested one, unless the
/// requester does not know the destination seqno at all.
#[must_use]
pub fn can_reply_from_cache(cached_seqno: u32, requested_seqno: u32, unknown_seqno: bool) -> bool {
    unknown_seqno || !seqno_newer(requested_seqno, cached_seqno)
}
