//! Process-wide memoization with at-most-once computation per key.
//!
//! Concurrent callers asking for the same key block on one computation and
//! all observe its result. Failures are stored like successes, so a failing
//! kernel is not retried.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::trace;

struct Entry<V> {
    cell: OnceLock<V>,
    runs: AtomicUsize,
}

/// A map from keys to lazily computed, never-invalidated values.
pub struct SingleFlight<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Arc<Entry<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &K) -> Arc<Entry<V>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Entry {
                    cell: OnceLock::new(),
                    runs: AtomicUsize::new(0),
                })
            })
            .clone()
    }

    /// Value for `key`, computing it with `compute` if no caller has yet.
    ///
    /// The map lock is released before `compute` runs; only callers of the
    /// same key wait on each other.
    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce() -> V) -> V {
        let entry = self.entry(key);
        if let Some(value) = entry.cell.get() {
            trace!(cache = self.name, ?key, "hit");
            return value.clone();
        }
        entry
            .cell
            .get_or_init(|| {
                trace!(cache = self.name, ?key, "miss");
                entry.runs.fetch_add(1, Ordering::SeqCst);
                compute()
            })
            .clone()
    }

    /// Whether a value for `key` has been computed.
    pub fn contains(&self, key: &K) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).is_some_and(|e| e.cell.get().is_some())
    }

    /// How many times the value for `key` has been computed. Never more
    /// than one.
    pub fn computations(&self, key: &K) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .map_or(0, |e| e.runs.load(Ordering::SeqCst))
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|e| e.cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
