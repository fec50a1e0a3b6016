//! Sequence number bookkeeping and duplicate suppression.
//!
//! Two independent records live here:
//!
//! - the data-frame store: the newest data seqno accepted per source plus a
//!   small most-recently-seen cache, so that group traffic arriving out of
//!   order over several paths is delivered exactly once;
//! - the control-frame store: the freshest `(seqno, metric)` seen per PREQ or
//!   PREP originator, which decides whether a control element carries new
//!   information.

use std::collections::{HashMap, VecDeque};

use hwmp_core::types::{MacAddress, seqno_newer};

use crate::route::decision::is_fresher;

/// Most-recently-seen set of sequence numbers with a fixed capacity.
///
/// A lookup moves the value to the front; inserting into a full cache evicts
/// the least recently seen value.
#[derive(Debug, Clone)]
pub struct LruSeqnoCache {
    seqnos: VecDeque<u32>,
    capacity: usize,
}

impl LruSeqnoCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            seqnos: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `seqno` and report whether it had been seen before.
    pub fn check_seen(&mut self, seqno: u32) -> bool {
        let seen = match self.seqnos.iter().position(|s| *s == seqno) {
            Some(idx) => {
                self.seqnos.remove(idx);
                true
            }
            None => false,
        };
        self.seqnos.push_front(seqno);
        self.seqnos.truncate(self.capacity);
        seen
    }

    #[must_use]
    pub fn contains(&self, seqno: u32) -> bool {
        self.seqnos.contains(&seqno)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seqnos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seqnos.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Per-source sequence records for data and control frames.
#[derive(Debug, Clone)]
pub struct SequenceStore {
    last_data_seqno: HashMap<MacAddress, u32>,
    recent: HashMap<MacAddress, LruSeqnoCache>,
    control: HashMap<MacAddress, (u32, u32)>,
    cache_size: usize,
}

impl SequenceStore {
    pub fn new(cache_size: usize) -> Self {
        Self {
            last_data_seqno: HashMap::new(),
            recent: HashMap::new(),
            control: HashMap::new(),
            cache_size,
        }
    }

    /// Decide whether a data frame is new.
    ///
    /// A seqno strictly newer than the last accepted one is accepted and
    /// becomes the new reference. Anything else is checked against the
    /// recently-seen cache: a hit is a duplicate, a miss is an out-of-order
    /// frame that is accepted once.
    pub fn accept_data_frame(&mut self, seqno: u32, source: MacAddress) -> bool {
        let cache_size = self.cache_size;
        let recent = self
            .recent
            .entry(source)
            .or_insert_with(|| LruSeqnoCache::new(cache_size));

        match self.last_data_seqno.get(&source) {
            Some(&last) if !seqno_newer(seqno, last) => {
                let seen = recent.check_seen(seqno);
                if seen {
                    tracing::trace!(%source, seqno, "duplicate data frame");
                }
                !seen
            }
            _ => {
                self.last_data_seqno.insert(source, seqno);
                recent.check_seen(seqno);
                true
            }
        }
    }

    /// Newest data seqno accepted from `source`.
    #[must_use]
    pub fn last_data_seqno(&self, source: &MacAddress) -> Option<u32> {
        self.last_data_seqno.get(source).copied()
    }

    /// Accept a control element from `originator` if it is fresher than
    /// anything recorded, and record it.
    ///
    /// Fresher means a newer seqno, or the same seqno with a strictly lower
    /// metric.
    pub fn accept_control(&mut self, originator: MacAddress, seqno: u32, metric: u32) -> bool {
        let stored = self.control.get(&originator).copied();
        if !is_fresher(stored, seqno, metric) {
            tracing::trace!(%originator, seqno, metric, "stale control element");
            return false;
        }
        self.control.insert(originator, (seqno, metric));
        true
    }

    /// Recorded `(seqno, metric)` of the freshest control element from `originator`.
    #[must_use]
    pub fn control_record(&self, originator: &MacAddress) -> Option<(u32, u32)> {
        self.control.get(originator).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(i: u32) -> MacAddress {
        MacAddress::from_index(i)
    }

    #[test]
    fn test_lru_reports_repeat() {
        let mut cache = LruSeqnoCache::new(3);
        assert!(!cache.check_seen(1));
        assert!(cache.check_seen(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_evicts_least_recent() {
        let mut cache = LruSeqnoCache::new(3);
        cache.check_seen(1);
        cache.check_seen(2);
        cache.check_seen(3);
        // Touch 1 so that 2 becomes the oldest.
        assert!(cache.check_seen(1));
        cache.check_seen(4);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(4));
    }

    #[test]
    fn test_first_frame_accepted_repeat_rejected() {
        let mut store = SequenceStore::new(100);
        assert!(store.accept_data_frame(7, src(1)));
        assert!(!store.accept_data_frame(7, src(1)));
        assert_eq!(store.last_data_seqno(&src(1)), Some(7));
    }

    #[test]
    fn test_out_of_order_frame_accepted_once() {
        let mut store = SequenceStore::new(100);
        assert!(store.accept_data_frame(10, src(1)));
        assert!(store.accept_data_frame(8, src(1)));
        assert!(!store.accept_data_frame(8, src(1)));
        assert_eq!(store.last_data_seqno(&src(1)), Some(10));
    }

    #[test]
    fn test_sources_are_independent() {
        let mut store = SequenceStore::new(100);
        assert!(store.accept_data_frame(5, src(1)));
        assert!(store.accept_data_frame(5, src(2)));
    }

    #[test]
    fn test_newer_seqno_across_wrap() {
        let mut store = SequenceStore::new(100);
        assert!(store.accept_data_frame(u32::MAX, src(1)));
        assert!(store.accept_data_frame(1, src(1)));
        assert_eq!(store.last_data_seqno(&src(1)), Some(1));
    }

    #[test]
    fn test_evicted_seqno_is_accepted_again() {
        let mut store = SequenceStore::new(2);
        store.accept_data_frame(100, src(1));
        store.accept_data_frame(50, src(1));
        store.accept_data_frame(51, src(1));
        // 100 fell out of the two-entry window.
        assert!(store.accept_data_frame(100, src(1)));
    }

    #[test]
    fn test_control_freshness() {
        let mut store = SequenceStore::new(100);
        assert!(store.accept_control(src(1), 5, 300));
        assert!(!store.accept_control(src(1), 4, 10));
        assert!(!store.accept_control(src(1), 5, 300));
        assert!(store.accept_control(src(1), 5, 200));
        assert!(store.accept_control(src(1), 6, 900));
        assert_eq!(store.control_record(&src(1)), Some((6, 900)));
    }
}
