//! # TTL-LRU Cache
//!
//! Bounded key/value store with a fixed per-entry time-to-live and
//! least-recently-used eviction. Every logical cache in the gateway (pool
//! data, account info, balances, program accounts, token supply, reference
//! price) is one `TtlLruCache` for the lifetime of the process. The client's
//! polling fallback keeps its freshness window in one too.
//!
//! ## Semantics
//! - `len() <= max_size` at all times
//! - inserting a new key at capacity evicts the least-recently-accessed entry
//! - `get` and `set` refresh recency; `has` does not
//! - an entry older than `ttl` is a miss, and is removed when observed
//! - absence is `None`, never an error
//!
//! ## Example
//! ```no_run
//! use lib_utils::cache::TtlLruCache;
//! use std::time::Duration;
//!
//! let cache: TtlLruCache<String, u64> = TtlLruCache::new("balances", 1000, Duration::from_secs(10));
//! cache.set("wallet:confirmed".to_string(), 42);
//! assert_eq!(cache.get(&"wallet:confirmed".to_string()), Some(42));
//! ```

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    /// Recency stamp; key into `Store::order`
    touched: u64,
}

struct Store<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Recency stamp -> key, oldest first
    order: BTreeMap<u64, K>,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> Store<K, V> {
    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.touched);
        Some(entry)
    }

    fn touch(&mut self, key: &K) {
        let stamp = self.next_stamp();
        if let Some(entry) = self.entries.get_mut(key) {
            self.order.remove(&entry.touched);
            entry.touched = stamp;
            self.order.insert(stamp, key.clone());
        }
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Thread-safe TTL + LRU cache.
///
/// All operations are short synchronous critical sections; the lock is never
/// held across an `.await`.
pub struct TtlLruCache<K, V> {
    name: &'static str,
    max_size: usize,
    ttl: Duration,
    store: Mutex<Store<K, V>>,
}

impl<K, V> TtlLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache. A `max_size` of zero is treated as one.
    pub fn new(name: &'static str, max_size: usize, ttl: Duration) -> Self {
        Self {
            name,
            max_size: max_size.max(1),
            ttl,
            store: Mutex::new(Store {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                clock: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) > self.ttl
    }

    /// Look up a key, refreshing its recency on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut store = self.store.lock();

        let expired = match store.entries.get(key) {
            None => return None,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            store.remove(key);
            debug!(cache = self.name, "Cache entry expired");
            return None;
        }

        store.touch(key);
        store.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or replace a value. Replacing resets the entry's age.
    pub fn set(&self, key: K, value: V) {
        let now = Instant::now();
        let mut store = self.store.lock();

        if store.remove(&key).is_none() && store.entries.len() >= self.max_size {
            if store.evict_oldest().is_some() {
                debug!(cache = self.name, max_size = self.max_size, "Evicted least recently used entry");
            }
        }

        let touched = store.next_stamp();
        store.order.insert(touched, key.clone());
        store.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                touched,
            },
        );
    }

    /// Presence check with the same expiry semantics as `get`.
    pub fn has(&self, key: &K) -> bool {
        let now = Instant::now();
        let mut store = self.store.lock();

        let expired = match store.entries.get(key) {
            None => return false,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            store.remove(key);
            return false;
        }
        true
    }

    /// Remove a key; returns whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.store.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.entries.clear();
        store.order.clear();
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.lock();

        let expired: Vec<K> = store
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            store.remove(key);
        }
        expired.len()
    }

    /// Live keys, oldest access first.
    pub fn keys(&self) -> Vec<K> {
        self.cleanup();
        self.store.lock().order.values().cloned().collect()
    }

    /// Live values, oldest access first.
    pub fn values(&self) -> Vec<V> {
        self.cleanup();
        let store = self.store.lock();
        store
            .order
            .values()
            .filter_map(|key| store.entries.get(key).map(|entry| entry.value.clone()))
            .collect()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> TtlLruCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Sweep expired entries on a fixed interval, independent of read traffic.
    ///
    /// The task holds a weak reference and ends once the cache is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.cleanup();
                if removed > 0 {
                    debug!(cache = cache.name, removed, "Swept expired cache entries");
                }
            }
        })
    }
}
