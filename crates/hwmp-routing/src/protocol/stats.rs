//! Protocol counters.

use std::fmt;

/// Counters kept by one protocol instance. All start at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub tx_unicast: u64,
    pub tx_broadcast: u64,
    pub tx_bytes: u64,
    pub dropped_ttl: u64,
    pub total_queued: u64,
    pub total_dropped: u64,
    pub initiated_preq: u64,
    pub initiated_prep: u64,
    pub initiated_perr: u64,
    pub initiated_prune: u64,
    /// Control elements rejected as not fresher than what is known.
    pub stale_sequence: u64,
    pub duplicate_frames: u64,
    pub queue_overflow: u64,
    /// Group frames not relayed because every receiver was pruned.
    pub pruned_frames: u64,
    pub rejected_route_updates: u64,
    pub malformed_elements: u64,
}

impl Statistics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "txUnicast={} txBroadcast={} txBytes={} droppedTtl={} totalQueued={} \
             totalDropped={} initiatedPreq={} initiatedPrep={} initiatedPerr={} \
             initiatedPrune={} staleSequence={} duplicateFrames={} queueOverflow={} \
             prunedFrames={} rejectedRouteUpdates={} malformedElements={}",
            self.tx_unicast,
            self.tx_broadcast,
            self.tx_bytes,
            self.dropped_ttl,
            self.total_queued,
            self.total_dropped,
            self.initiated_preq,
            self.initiated_prep,
            self.initiated_perr,
            self.initiated_prune,
            self.stale_sequence,
            self.duplicate_frames,
            self.queue_overflow,
            self.pruned_frames,
            self.rejected_route_updates,
            self.malformed_elements,
        )
    }
}
