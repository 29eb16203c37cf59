//! Thread-safe store for per-connection retransmission counters.
//!
//! One writer (the ingestion loop) and any number of concurrent readers
//! (metrics scrapes). Counters are created lazily on first observation of a
//! label key and only ever increase. There is no eviction: cardinality is
//! bounded by distinct live connections, and the key count is exposed
//! through [`CounterStore::len`] as a diagnostic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::labels::LabelKey;

#[derive(Default)]
pub struct CounterStore {
    counters: RwLock<HashMap<LabelKey, Arc<AtomicU64>>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to the counter for `key`, creating it on first observation.
    ///
    /// The fast path takes the read lock and bumps the per-key atomic, so
    /// increments to known keys never contend with each other or with
    /// scrapes beyond the shared read lock.
    pub fn increment(&self, key: LabelKey) {
        {
            let counters = self.counters.read();
            if let Some(counter) = counters.get(&key) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        self.counters
            .write()
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Read out every counter. Each value is consistent at the instant it is
    /// read; the snapshot as a whole is not atomic across keys.
    pub fn snapshot(&self) -> Vec<(LabelKey, u64)> {
        self.counters
            .read()
            .iter()
            .map(|(key, counter)| (key.clone(), counter.load(Ordering::Relaxed)))
            .collect()
    }

    /// Number of distinct label keys observed so far.
    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.read().is_empty()
    }
}
