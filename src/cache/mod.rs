//! Keyed render cache with TTL expiry and single-flight computation.
//!
//! # Architecture Overview
//!
//! [`KeyedCache`] memoizes the expensive part of rendering a source (glob
//! matching, file reads and YAML decoding) under a string key derived by a
//! [`CacheKeyFunc`]. It keeps two lock-free `DashMap`s:
//!
//! - `entries` - completed values with their expiry instant
//! - `in_flight` - one shared future per key currently being computed
//!
//! # Concurrency Contract
//!
//! - **Single flight**: a key maps to at most one in-flight computation. The
//!   first caller to miss registers a [`Shared`] future; every other caller
//!   missing the same key clones it and awaits the same result, success or
//!   failure, without invoking its own loader.
//! - **No cross-key blocking**: map guards are never held across an `.await`,
//!   so a slow computation for one key never delays a hit for another.
//! - **Caller-independent computation**: the registered future lives in the
//!   map, not in any caller. A caller that stops waiting (its future is
//!   dropped, e.g. by `tokio::time::timeout`) does not cancel it; the next
//!   waiter or caller drives it to completion.
//! - **Failures are not cached**: a failed computation leaves the stored entry
//!   as it was and every waiter receives the same
//!   [`RenderError::CacheComputation`].
//!
//! # Expiry
//!
//! Entries expire lazily: freshness is checked on access against
//! [`tokio::time::Instant`], so tests can drive expiry with
//! `tokio::time::pause`/`advance`. [`KeyedCache::prune_expired`] is an
//! explicit sweep for long-lived caches; it never changes what callers see.
//!
//! # Isolation
//!
//! Values are cloned when stored and again when served, so callers own what
//! they get back and can mutate it freely. `V` is expected to implement a
//! deep [`Clone`] (as `Vec<Document>` does).
//!
//! # Pass-through
//!
//! [`RenderCache::PassThrough`] represents "no cache": every call runs the
//! loader and no key is ever derived.

pub mod key;

pub use key::CacheKeyFunc;

use crate::core::{RenderError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a computed value is served before it is recomputed
    pub ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheOptions {
    /// Options with the given TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls served from a fresh stored entry
    pub hits: u64,
    /// Calls that found no fresh entry (leaders and waiters)
    pub misses: u64,
    /// Loader invocations
    pub computations: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

/// A stored value. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

type SharedResult<V> = std::result::Result<V, Arc<RenderError>>;
type InFlight<V> = Shared<BoxFuture<'static, SharedResult<V>>>;

/// Generic TTL cache with single-flight computation per key.
///
/// Cloning a `KeyedCache` is cheap and yields a handle to the same storage,
/// which is how one cache is shared between renderers.
pub struct KeyedCache<V> {
    ttl: Duration,
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    in_flight: Arc<DashMap<String, InFlight<V>>>,
    counters: Arc<Counters>,
}

impl<V> Clone for KeyedCache<V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
            in_flight: Arc::clone(&self.in_flight),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<V> std::fmt::Debug for KeyedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl<V> KeyedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            ttl: options.ttl,
            entries: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the value for `key`, computing it with `loader` on a miss.
    ///
    /// - Fresh entry: a copy of the stored value is returned and `loader` is
    ///   not called.
    /// - Miss or expired entry with a computation already running: waits for
    ///   that computation; `loader` is not called.
    /// - Otherwise `loader` is called once and its future becomes the
    ///   key's in-flight computation.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::CacheComputation`] wrapping the loader's error.
    /// Every caller that waited on the same computation receives it.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, loader: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if let Some(value) = self.fresh(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(target: "cache", "Hit for {}", key);
            return Ok(value);
        }

        let computation = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(target: "cache", "Waiting for in-flight computation of {}", key);
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                // A computation may have finished between the lookup above
                // and taking the slot; it stores before it unregisters.
                if let Some(value) = self.fresh(key) {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }

                debug!(target: "cache", "Computing {}", key);
                self.counters.computations.fetch_add(1, Ordering::Relaxed);
                let computation = self.register(key.to_string(), loader());
                slot.insert(computation.clone());
                computation
            }
        };

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        computation.await.map_err(RenderError::CacheComputation)
    }

    /// Wrap `work` so that whoever polls it to completion stores the result
    /// and unregisters the in-flight slot.
    fn register<Fut>(&self, key: String, work: Fut) -> InFlight<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let in_flight = Arc::clone(&self.in_flight);
        let ttl = self.ttl;

        async move {
            let result = work.await;
            match &result {
                Ok(value) => {
                    entries.insert(
                        key.clone(),
                        CacheEntry {
                            value: value.clone(),
                            expires_at: Instant::now() + ttl,
                        },
                    );
                }
                Err(e) => warn!(target: "cache", "Computation for {} failed: {}", key, e),
            }
            in_flight.remove(&key);
            result.map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    fn fresh(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        (Instant::now() < entry.expires_at).then(|| entry.value.clone())
    }

    /// Drop the stored entry for `key`. A running computation is unaffected.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every stored entry. Running computations are unaffected.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries and return how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let pruned = before.saturating_sub(self.entries.len());
        if pruned > 0 {
            debug!(target: "cache", "Pruned {} expired entries", pruned);
        }
        pruned
    }

    /// Number of stored entries, fresh or expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of computations currently registered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Snapshot of the hit/miss/computation counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
        }
    }
}

/// Cache policy used by a renderer.
pub enum RenderCache<V> {
    /// No caching: every call runs its loader
    PassThrough,
    /// Memoize through a (possibly shared) [`KeyedCache`]
    Keyed(KeyedCache<V>),
}

impl<V> Clone for RenderCache<V> {
    fn clone(&self) -> Self {
        match self {
            Self::PassThrough => Self::PassThrough,
            Self::Keyed(cache) => Self::Keyed(cache.clone()),
        }
    }
}

impl<V> Default for RenderCache<V> {
    fn default() -> Self {
        Self::PassThrough
    }
}

impl<V> std::fmt::Debug for RenderCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassThrough => f.write_str("PassThrough"),
            Self::Keyed(cache) => f.debug_tuple("Keyed").field(cache).finish(),
        }
    }
}

impl<V> RenderCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Run `loader` through the cache.
    ///
    /// `key` is only evaluated when caching is enabled.
    pub async fn get_or_compute<K, F, Fut>(&self, key: K, loader: F) -> Result<V>
    where
        K: FnOnce() -> String,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        match self {
            Self::PassThrough => loader().await,
            Self::Keyed(cache) => cache.get_or_compute(&key(), loader).await,
        }
    }

    /// The underlying keyed cache, if any.
    pub fn keyed(&self) -> Option<&KeyedCache<V>> {
        match self {
            Self::PassThrough => None,
            Self::Keyed(cache) => Some(cache),
        }
    }
}
