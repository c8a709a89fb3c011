//! In-memory TTL cache with LRU eviction.
//!
//! Entries expire lazily: a lookup past the TTL removes the entry and
//! reports a miss. When full, inserts first drop expired entries and then
//! the least recently used one.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::types::{CoordinateKey, WeatherPayload};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(1800);

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded map whose entries expire `ttl` after insertion.
///
/// Recency lives in the [`LruCache`]; the mutex is needed because reads
/// reorder it.
pub struct TtlCache<K, V> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// Cache of validated payloads keyed by location.
pub type WeatherCache = TtlCache<CoordinateKey, Arc<WeatherPayload>>;

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        // A zero capacity cache never stores, see `put`
        let bound = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(bound)),
            capacity,
            ttl,
            clock,
        }
    }

    /// Fetch a live entry, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = self.is_expired(entries.peek(key)?, now);
        if expired {
            entries.pop(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or replace an entry. A replaced entry's age restarts.
    ///
    /// When full, expired entries go first; if none have expired the
    /// least recently used entry is evicted.
    pub fn put(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if !entries.contains(&key) && entries.len() >= self.capacity {
            self.purge_expired(&mut entries, now);
        }

        let entry = Entry {
            value,
            inserted_at: now,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                tracing::trace!("Evicted least recently used cache entry");
            }
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().pop(key).map(|e| e.value)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn purge_expired(&self, entries: &mut LruCache<K, Entry<V>>, now: Instant) {
        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
