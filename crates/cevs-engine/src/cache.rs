//! Single-slot TTL cache for normalized listings. Unfiltered listing
//! requests are served from here; any filter bypasses the cache so filtered
//! views never go stale against each other. One slot is enough: listings
//! are cheap to rebuild and the common access pattern polls one source.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use cevs_core::{CanonicalRecord, SourceKind};

struct CachedListing {
    kind: SourceKind,
    stored_at: Instant,
    records: Vec<CanonicalRecord>,
}

pub struct ResultCache {
    ttl: Duration,
    slot: Mutex<Option<CachedListing>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self, kind: SourceKind) -> Option<Vec<CanonicalRecord>> {
        let slot = self.slot.lock();
        slot.as_ref()
            .filter(|entry| entry.kind == kind && entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.records.clone())
    }

    /// Last write wins; a fill for another kind evicts the current slot.
    pub fn put(&self, kind: SourceKind, records: Vec<CanonicalRecord>) {
        *self.slot.lock() = Some(CachedListing {
            kind,
            stored_at: Instant::now(),
            records,
        });
    }

    pub fn is_fresh(&self, kind: SourceKind) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|entry| entry.kind == kind && entry.stored_at.elapsed() < self.ttl)
    }

    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CanonicalRecord {
        CanonicalRecord::empty(SourceKind::Iso, 0)
    }

    #[test]
    fn fresh_entries_are_served() {
        let cache = ResultCache::new(Duration::from_secs(60));
        assert!(cache.get(SourceKind::Iso).is_none());
        assert!(!cache.is_fresh(SourceKind::Iso));
        cache.put(SourceKind::Iso, vec![record()]);
        assert_eq!(cache.get(SourceKind::Iso).map(|r| r.len()), Some(1));
        assert!(cache.is_fresh(SourceKind::Iso));
        // The slot holds one kind; other kinds miss.
        assert!(cache.get(SourceKind::Epa).is_none());
    }

    #[test]
    fn newer_fill_evicts_the_slot() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put(SourceKind::Iso, vec![record()]);
        cache.put(SourceKind::Epa, Vec::new());
        assert!(cache.get(SourceKind::Iso).is_none());
        assert_eq!(cache.get(SourceKind::Epa).map(|r| r.len()), Some(0));
    }

    #[test]
    fn expired_entries_miss() {
        let cache = ResultCache::new(Duration::ZERO);
        cache.put(SourceKind::Iso, vec![record()]);
        assert!(cache.get(SourceKind::Iso).is_none());
        assert!(!cache.is_fresh(SourceKind::Iso));
    }

    #[test]
    fn invalidate_clears_the_slot() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put(SourceKind::Iso, vec![record()]);
        cache.invalidate();
        assert!(cache.get(SourceKind::Iso).is_none());
    }
}
