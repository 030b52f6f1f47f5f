//! LRU result caches.
//!
//! Two independent bounded maps live on the analyzer: full analyses and helper
//! projections. Both are classic LRU (a `get` touches recency, a `put` over
//! capacity evicts the least recently used entry) behind a mutex, with hit and
//! miss counters on the side. Values are `Arc`s of immutable results; an
//! update replaces the entry, it never mutates a value a caller may hold.
//!
//! A capacity of zero disables the map.

use crate::api::HelperField;
use crate::config::AttachmentStyle;
use crate::engine::AnalysisMode;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

/// Full-analysis key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct AnalysisKey {
    pub version: &'static str,
    /// Hash of the configuration and rules the analyzer was built with.
    pub fingerprint: Arc<str>,
    pub mode: AnalysisMode,
    pub attachment: Option<AttachmentStyle>,
    /// Normalized, clamped text.
    pub text: String,
}

/// Helper-projection key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct HelperKey {
    pub fields: HelperField,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

pub(crate) struct LruStore<K: Hash + Eq, V> {
    inner: Option<Mutex<LruCache<K, V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> LruStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `key` and touch it. `accept` can reject a stale entry, which
    /// then counts as a miss.
    pub(crate) fn get_if(&self, key: &K, accept: impl FnOnce(&V) -> bool) -> Option<V> {
        let found = self
            .inner
            .as_ref()
            .and_then(|m| m.lock().ok())
            .and_then(|mut cache| cache.get(key).filter(|v| accept(v)).cloned());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.get_if(key, |_| true)
    }

    pub(crate) fn put(&self, key: K, value: V) {
        if let Some(mut cache) = self.inner.as_ref().and_then(|m| m.lock().ok()) {
            cache.put(key, value);
        }
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let (entries, capacity) = match self.inner.as_ref().and_then(|m| m.lock().ok()) {
            Some(cache) => (cache.len(), cache.cap().get()),
            None => (0, 0),
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
            capacity,
        }
    }
}

/// Hex SHA-256 of `data`.
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_touches_recency() {
        let store: LruStore<&str, u32> = LruStore::new(2);
        store.put("a", 1);
        store.put("b", 2);
        assert_eq!(store.get(&"a"), Some(1));
        store.put("c", 3);
        // "b" was least recently used.
        assert_eq!(store.get(&"b"), None);
        assert_eq!(store.get(&"a"), Some(1));
        assert_eq!(store.get(&"c"), Some(3));
    }

    #[test]
    fn rejected_entries_count_as_misses() {
        let store: LruStore<u8, u32> = LruStore::new(4);
        store.put(1, 10);
        assert_eq!(store.get_if(&1, |v| *v > 100), None);
        assert_eq!(store.get(&1), Some(10));
        assert_eq!(store.get(&2), None);
        let stats = store.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries, stats.capacity), (1, 2, 1, 4));
    }

    #[test]
    fn zero_capacity_disables_the_map() {
        let store: LruStore<u8, u32> = LruStore::new(0);
        store.put(1, 10);
        assert_eq!(store.get(&1), None);
        assert_eq!(store.stats().capacity, 0);
    }

    #[test]
    fn sha256_is_hex() {
        assert_eq!(sha256_hex(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
