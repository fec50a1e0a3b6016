//! Per-interface rate limiting of PREQ and PERR transmissions.
//!
//! Elements are queued here first. The protocol flushes the queue right away
//! when the minimum interval since the last transmission has passed and
//! otherwise arms a flush timer for the moment it will have.

use std::time::Duration;

use hwmp_core::constants::PREQ_MAX_DESTINATIONS;
use hwmp_core::element::{FailedDestination, PerrElement, PreqElement};
use hwmp_core::types::MacAddress;

use super::env::TimerHandle;

/// A PERR waiting for its interface, with the link receivers it goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingPerr {
    pub(crate) element: PerrElement,
    pub(crate) receivers: Vec<MacAddress>,
}

#[derive(Debug, Default)]
pub(crate) struct InterfaceState {
    pub(crate) last_preq: Option<Duration>,
    pub(crate) pending_preqs: Vec<PreqElement>,
    pub(crate) preq_timer: Option<TimerHandle>,
    pub(crate) last_perr: Option<Duration>,
    pub(crate) pending_perrs: Vec<PendingPerr>,
    pub(crate) perr_timer: Option<TimerHandle>,
}

/// Time left before another frame may go out, or `None` if one may go now.
pub(crate) fn hold_off(last: Option<Duration>, now: Duration, min_interval: Duration) -> Option<Duration> {
    let next = last?.checked_add(min_interval)?;
    (next > now).then(|| next - now)
}

impl InterfaceState {
    /// Queue a PREQ. A PREQ originated here joins a pending one from this
    /// node when both are reactive and the pending one has room.
    pub(crate) fn queue_preq(&mut self, preq: PreqElement) {
        let originated = preq.hop_count == 0 && !preq.is_proactive();
        if originated
            && let Some(pending) = self.pending_preqs.iter_mut().find(|p| {
                p.hop_count == 0
                    && !p.is_proactive()
                    && p.originator == preq.originator
                    && p.destinations.len() + preq.destinations.len() <= PREQ_MAX_DESTINATIONS
            })
        {
            for dest in preq.destinations {
                pending.add_destination(dest);
            }
            pending.originator_seqno = preq.originator_seqno;
            pending.preq_id = preq.preq_id;
            return;
        }
        self.pending_preqs.push(preq);
    }

    /// Queue failed destinations for `receivers`, merging into a pending PERR
    /// with the same receivers while it has room.
    pub(crate) fn queue_perr(&mut self, destinations: &[FailedDestination], receivers: Vec<MacAddress>, ttl: u8) {
        let mut rest = destinations.iter().copied().peekable();
        if let Some(pending) = self.pending_perrs.iter_mut().find(|p| p.receivers == receivers) {
            pending.element.ttl = pending.element.ttl.max(ttl);
            while let Some(failed) = rest.peek().copied() {
                if !pending.element.add_destination(failed) {
                    break;
                }
                rest.next();
            }
        }
        while rest.peek().is_some() {
            let mut element = PerrElement::new(ttl);
            while let Some(failed) = rest.peek().copied() {
                if !element.add_destination(failed) {
                    break;
                }
                rest.next();
            }
            self.pending_perrs.push(PendingPerr {
                element,
                receivers: receivers.clone(),
            });
        }
    }
}
