//! TTL cache with FIFO capacity eviction
//!
//! Wraps the route and clustering pipelines to skip recomputation for
//! unchanged inputs within a time window. Eviction is lazy on read (expired
//! entries) plus insertion-order FIFO on write at capacity; there is no
//! background sweeper. All timestamps are explicit call parameters, so the
//! cache never reads the wall clock itself.

use crate::LocationSample;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at_ms: i64,
    ttl_ms: u64,
}

/// Bounded key-value cache with per-entry TTLs
///
/// At capacity the oldest-*inserted* entry is evicted, regardless of how
/// recently it was read. FIFO is simpler and more predictable than LRU here:
/// recomputation is cheap and entries go stale by age, not by access
/// pattern. Updating an existing key keeps its original eviction position.
///
/// The cache is the only stateful piece of this crate; share it across
/// threads behind a single `Mutex`.
#[derive(Debug, Clone)]
pub struct ExpiringCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    insertion_order: VecDeque<K>,
    capacity: NonZeroUsize,
}

impl<K: Eq + Hash + Clone, V> ExpiringCache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.get()),
            insertion_order: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Insert or update an entry, evicting the oldest-inserted one at capacity
    ///
    /// `now_ms` is the caller's clock reading; entries expire once
    /// `now - inserted_at >= ttl_ms`, so a zero TTL is an immediate miss.
    pub fn set(&mut self, key: K, value: V, ttl_ms: u64, now_ms: i64) {
        if let Some(entry) = self.entries.get_mut(&key) {
            *entry = CacheEntry {
                value,
                inserted_at_ms: now_ms,
                ttl_ms,
            };
            return;
        }

        if self.entries.len() >= self.capacity.get() {
            while let Some(oldest) = self.insertion_order.pop_front() {
                if self.entries.remove(&oldest).is_some() {
                    break;
                }
            }
        }

        self.insertion_order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at_ms: now_ms,
                ttl_ms,
            },
        );
    }

    /// Look up an entry, lazily evicting it when expired
    pub fn get(&mut self, key: &K, now_ms: i64) -> Option<&V> {
        let expired = {
            let entry = self.entries.get(key)?;
            let age_ms = now_ms.saturating_sub(entry.inserted_at_ms);
            age_ms >= 0 && age_ms as u64 >= entry.ttl_ms
        };

        if expired {
            self.entries.remove(key);
            self.insertion_order.retain(|k| k != key);
            return None;
        }

        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Number of live entries, including any not yet lazily expired
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }
}

/// Fingerprint a sample batch for use as a cache key
///
/// Hashes the fields that affect processing output (coordinates, timestamps,
/// speeds, ignition). Stable within one process run, which matches the
/// cache's in-memory lifetime; not suitable as a persistent identity.
pub fn fingerprint_samples(samples: &[LocationSample]) -> u64 {
    let mut hasher = DefaultHasher::new();
    samples.len().hash(&mut hasher);
    for sample in samples {
        sample.latitude.to_bits().hash(&mut hasher);
        sample.longitude.to_bits().hash(&mut hasher);
        sample.timestamp_ms.hash(&mut hasher);
        sample.speed_kmh.to_bits().hash(&mut hasher);
        sample.ignition_on.hash(&mut hasher);
    }
    hasher.finish()
}
