//! Size- and age-bounded in-memory store.
//!
//! Entries live in an LRU of fixed capacity and carry their insertion instant.
//! An entry older than the TTL no longer counts as a hit, but its value stays
//! readable through [`TtlLruStore::get_stale`] until it is replaced, evicted
//! or cleared, so callers can fall back to it when a refresh fails.

use std::{
    sync::RwLock,
    time::{Duration, Instant},
};

use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const METRIC_CACHE_HIT: &str = "folio_cache_hit_total";
const METRIC_CACHE_MISS: &str = "folio_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "folio_cache_evict_total";

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A held value together with its freshness.
#[derive(Debug, Clone)]
pub struct Held<V> {
    pub value: V,
    pub age: Duration,
    pub is_expired: bool,
}

pub struct TtlLruStore<V> {
    entries: RwLock<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlLruStore<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            ttl: config.ttl,
        }
    }

    /// Fresh value for `key`, marking it most recently used.
    ///
    /// Expired entries are reported as misses and left in place.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = rw_write(&self.entries, "get");

        let fresh = match entries.peek(key) {
            Some(entry) => entry.inserted_at.elapsed() < self.ttl,
            None => {
                counter!(METRIC_CACHE_MISS, "reason" => "absent").increment(1);
                return None;
            }
        };

        if !fresh {
            counter!(METRIC_CACHE_MISS, "reason" => "expired").increment(1);
            return None;
        }

        counter!(METRIC_CACHE_HIT).increment(1);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Whatever value is still held for `key`, fresh or not. Does not touch LRU order.
    pub fn get_stale(&self, key: &str) -> Option<Held<V>> {
        rw_read(&self.entries, "get_stale").peek(key).map(|entry| {
            let age = entry.inserted_at.elapsed();
            Held {
                value: entry.value.clone(),
                age,
                is_expired: age >= self.ttl,
            }
        })
    }

    /// Store `value` with a fresh timestamp.
    ///
    /// Returns the key pushed out to make room, if the store was full.
    pub fn insert(&self, key: String, value: V) -> Option<String> {
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
        };
        let displaced = rw_write(&self.entries, "insert").push(key.clone(), entry);

        match displaced {
            Some((displaced_key, _)) if displaced_key != key => {
                counter!(METRIC_CACHE_EVICT).increment(1);
                Some(displaced_key)
            }
            _ => None,
        }
    }

    pub fn clear(&self) {
        rw_write(&self.entries, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        rw_read(&self.entries, "capacity").cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
