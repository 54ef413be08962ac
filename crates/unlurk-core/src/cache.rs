//! In-memory cache with a per-entry TTL computed at insertion.
//!
//! Expiry is lazy: an entry past `inserted_at + ttl` is treated as absent and is
//! dropped by the next `get`/`put` that touches its key, or by an explicit [`TtlCache::sweep`].
//! Nothing evicts on a timer.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::clock::{elapsed, Clock};

/// Computes the TTL for a key at insertion time.
pub type TtlPolicy<K> = Box<dyn Fn(&K, DateTime<Utc>) -> Duration + Send + Sync>;

/// Cached value with its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,

    /// When the value was stored.
    pub inserted_at: DateTime<Utc>,

    /// How long the value stays valid.
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        elapsed(self.inserted_at, now) >= self.ttl
    }
}

/// Thread-safe TTL cache.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    policy: TtlPolicy<K>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache whose entry TTLs are computed by `policy`.
    pub fn new<P>(clock: Arc<dyn Clock>, policy: P) -> Self
    where
        P: Fn(&K, DateTime<Utc>) -> Duration + Send + Sync + 'static,
    {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            policy: Box::new(policy),
        }
    }

    /// Create a cache where every entry lives for `ttl`.
    pub fn with_fixed_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self
    where
        K: 'static,
    {
        Self::new(clock, move |_, _| ttl)
    }

    /// Look up `keys`, returning the unexpired matches in input order.
    pub fn get(&self, keys: &[K]) -> Vec<(K, V)> {
        let now = self.clock.now();
        let mut found = Vec::new();
        let mut expired = Vec::new();

        {
            let entries = self.read();
            for key in keys {
                match entries.get(key) {
                    Some(entry) if entry.is_expired(now) => expired.push(key.clone()),
                    Some(entry) => found.push((key.clone(), entry.value.clone())),
                    None => {}
                }
            }
        }

        if !expired.is_empty() {
            let mut entries = self.write();
            for key in &expired {
                // Another caller may have refreshed the entry in between.
                if entries.get(key).is_some_and(|e| e.is_expired(now)) {
                    entries.remove(key);
                }
            }
            trace!(expired = expired.len(), "dropped expired cache entries");
        }

        found
    }

    /// Look up a single key.
    pub fn get_one(&self, key: &K) -> Option<V> {
        self.get(std::slice::from_ref(key))
            .into_iter()
            .next()
            .map(|(_, v)| v)
    }

    /// Insert or overwrite `key`. A zero TTL stores nothing and drops any earlier entry.
    pub fn put(&self, key: K, value: V) {
        let now = self.clock.now();
        let ttl = (self.policy)(&key, now);
        let mut entries = self.write();

        if ttl.is_zero() {
            entries.remove(&key);
            return;
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                ttl,
            },
        );
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&self, key: &K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get_one(key) {
            return value;
        }

        let value = compute();
        self.put(key.clone(), value.clone());
        value
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of retained entries, expired ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // The map is never left half-written, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.read().map(|e| e.len()).unwrap_or_default();
        f.debug_struct("TtlCache").field("entries", &len).finish()
    }
}
