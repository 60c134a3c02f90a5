//! A concurrent cache with time-to-idle expiration.

use std::{
    future::Future,
    hash::Hash,
    marker::PhantomData,
    sync::{Arc, Weak},
    time::Duration,
};

use quanta::{Clock, Instant};
use snafu::Snafu;
use tokio::time::sleep;
use tracing::debug;

use crate::{collections::FastConcurrentHashMap, hash::get_fast_build_hasher};

mod expiry;
use self::expiry::Expiration;

const DEFAULT_EXPIRATION_INTERVAL: Duration = Duration::from_secs(1);

/// Cache builder error.
#[derive(Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum CacheBuilderError {
    /// The cache identifier was empty.
    #[snafu(display("cache identifier must not be empty"))]
    EmptyIdentifier,
}

/// Outcome of a [`Cache::compute`] closure, describing what should happen to the entry.
#[derive(Debug, Eq, PartialEq)]
pub enum Operation<V> {
    /// Store the given value, replacing any existing value.
    Insert(V),

    /// Leave the value as-is.
    ///
    /// If an entry exists, it is still considered accessed.
    Keep,

    /// Remove the entry, if one exists.
    Remove,
}

/// Builder for creating a [`Cache`].
pub struct CacheBuilder<K, V> {
    identifier: String,
    capacity: usize,
    idle_period: Option<Duration>,
    expiration_interval: Option<Duration>,
    clock: Option<Clock>,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
}

impl<K, V> CacheBuilder<K, V> {
    /// Creates a new `CacheBuilder` with the given cache identifier.
    ///
    /// The identifier is attached to log events emitted by the cache, and does not need to be unique.
    ///
    /// # Errors
    ///
    /// If the given cache identifier is empty, an error is returned.
    pub fn from_identifier<N: Into<String>>(identifier: N) -> Result<CacheBuilder<K, V>, CacheBuilderError> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(CacheBuilderError::EmptyIdentifier);
        }

        Ok(Self::with_valid_identifier(identifier))
    }

    /// Configures a [`CacheBuilder`] that is suitable for tests.
    ///
    /// This uses a cache identifier of "noop" and no expiration.
    pub fn for_tests() -> CacheBuilder<K, V> {
        Self::with_valid_identifier(String::from("noop"))
    }

    fn with_valid_identifier(identifier: String) -> CacheBuilder<K, V> {
        CacheBuilder {
            identifier,
            capacity: 0,
            idle_period: None,
            expiration_interval: None,
            clock: None,
            _key: PhantomData,
            _value: PhantomData,
        }
    }

    /// Sets the number of items the cache has room for before it first needs to grow.
    ///
    /// This is not a limit: the cache grows as needed.
    ///
    /// Defaults to zero.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enables expiration of cached items based on how long since they were last accessed.
    ///
    /// Items which have not been accessed within the configured duration are treated as absent, and are physically
    /// removed by the next sweep. For the purposes of expiration, "accessed" is any compute touching the item.
    ///
    /// If the given value is `None`, expiration is disabled.
    ///
    /// Defaults to no expiration.
    pub fn with_time_to_idle(mut self, idle_period: Option<Duration>) -> Self {
        self.idle_period = idle_period;

        if self.idle_period.is_some() {
            self.expiration_interval = self.expiration_interval.or(Some(DEFAULT_EXPIRATION_INTERVAL));
        }

        self
    }

    /// Sets the interval at which the expiration driver sweeps for expired items.
    ///
    /// The rough upper bound for how long an idle item may stay resident is the sum of the time-to-idle and this
    /// interval. Only relevant if expiration is enabled.
    ///
    /// Defaults to 1 second.
    pub fn with_expiration_interval(mut self, expiration_interval: Duration) -> Self {
        self.expiration_interval = Some(expiration_interval);
        self
    }

    /// Sets the clock used to track item access times.
    ///
    /// Primarily useful for tests, where a mocked clock allows expiration to be driven deterministically.
    ///
    /// Defaults to a regular [`Clock`].
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds a [`Cache`] from the current configuration.
    ///
    /// No background work is started. When expiration is enabled, the caller is responsible for running the future
    /// returned by [`Cache::expiration_driver`], or for calling [`Cache::sweep_expired`] periodically.
    pub fn build(self) -> Cache<K, V> {
        let expiration = Expiration::new(self.clock.unwrap_or_else(Clock::new), self.idle_period);
        let expiration_interval = if expiration.is_enabled() {
            self.expiration_interval
        } else {
            None
        };

        Cache {
            inner: Arc::new(Inner {
                identifier: self.identifier,
                items: FastConcurrentHashMap::with_capacity_and_hasher(self.capacity, get_fast_build_hasher()),
                expiration,
                expiration_interval,
            }),
        }
    }
}

struct CacheEntry<V> {
    value: V,
    last_accessed: Instant,
}

struct Inner<K, V> {
    identifier: String,
    items: FastConcurrentHashMap<K, CacheEntry<V>>,
    expiration: Expiration,
    expiration_interval: Option<Duration>,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash,
{
    fn sweep_expired(&self) -> usize {
        if !self.expiration.is_enabled() {
            return 0;
        }

        let now = self.expiration.now();
        let mut removed = 0;
        self.items.pin().retain(|_, entry| {
            let expired = self.expiration.is_expired(entry.last_accessed, now);
            if expired {
                removed += 1;
            }
            !expired
        });

        removed
    }
}

/// A concurrent cache with optional time-to-idle expiration.
///
/// Items live in a lock-free concurrent map, so operations on different keys never block each other, and
/// [`compute`][Cache::compute] is an atomic read-modify-write for its key.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
{
    /// Returns the number of items currently held by the cache.
    ///
    /// Expired items which have not yet been swept are included.
    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    /// Returns `true` if the cache holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// Atomically reads and updates the entry for `key`.
    ///
    /// `f` is called with the current value (`None` if absent or expired) and returns the [`Operation`] to apply. If
    /// another update to the same key lands first, `f` is called again with the newer value, so it must be free of side
    /// effects other than recording its latest outcome. Updates to the same key never interleave.
    pub fn compute<F>(&self, key: K, mut f: F)
    where
        F: FnMut(Option<&V>) -> Operation<V>,
        V: Clone,
    {
        let now = self.inner.expiration.now();
        let expiration = &self.inner.expiration;

        let _ = self.inner.items.pin().compute(key, |existing| {
            let live = existing
                .map(|(_, entry)| entry)
                .filter(|entry| !expiration.is_expired(entry.last_accessed, now));

            match (f(live.map(|entry| &entry.value)), live) {
                (Operation::Insert(value), _) => papaya::Operation::Insert(CacheEntry {
                    value,
                    last_accessed: now,
                }),
                (Operation::Keep, Some(entry)) => papaya::Operation::Insert(CacheEntry {
                    value: entry.value.clone(),
                    last_accessed: now,
                }),
                // An expired entry is dropped, whatever the closure asked for.
                (Operation::Keep | Operation::Remove, _) if existing.is_some() => papaya::Operation::Remove,
                (Operation::Keep | Operation::Remove, _) => papaya::Operation::Abort(()),
            }
        });
    }

    /// Removes all expired items from the cache, returning how many were removed.
    ///
    /// Concurrent operations proceed while a sweep is running.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Returns a future which periodically sweeps expired items from the cache.
    ///
    /// The future completes on its own once every handle to the cache has been dropped. If expiration is disabled,
    /// `None` is returned.
    pub fn expiration_driver(&self) -> Option<impl Future<Output = ()> + Send + 'static> {
        let expiration_interval = self.inner.expiration_interval?;
        Some(drive_expiration(Arc::downgrade(&self.inner), expiration_interval))
    }
}

async fn drive_expiration<K, V>(inner: Weak<Inner<K, V>>, expiration_interval: Duration)
where
    K: Eq + Hash,
{
    loop {
        sleep(expiration_interval).await;

        let Some(inner) = inner.upgrade() else {
            debug!("Cache dropped. Stopping expiration driver.");
            break;
        };

        let num_expired_items = inner.sweep_expired();
        debug!(cache_id = %inner.identifier, num_expired_items, "Removed expired items.");
    }
}
