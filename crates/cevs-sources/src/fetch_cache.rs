use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::types::RawRecord;

struct CachedFetch {
    stored_at: Instant,
    rows: Vec<RawRecord>,
}

/// Process-level cache of expensive full-dataset fetches, keyed by a
/// content fingerprint (the resolved endpoint). Writes are idempotent for a
/// given fingerprint, so last-write-wins is acceptable under concurrency.
pub struct FetchCache {
    ttl: Duration,
    inner: Mutex<HashMap<String, CachedFetch>>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<Vec<RawRecord>> {
        self.inner
            .lock()
            .get(fingerprint)
            .filter(|cached| cached.stored_at.elapsed() < self.ttl)
            .map(|cached| cached.rows.clone())
    }

    pub fn put(&self, fingerprint: &str, rows: Vec<RawRecord>) {
        self.inner.lock().insert(
            fingerprint.to_string(),
            CachedFetch {
                stored_at: Instant::now(),
                rows,
            },
        );
    }

    pub fn invalidate(&self) {
        self.inner.lock().clear();
    }
}
