//! Cumulative-to-delta conversion.

use std::{future::Future, time::Duration};

use quanta::Clock;
use snafu::{ResultExt as _, Snafu};
use tally_common::cache::{Cache, CacheBuilder, CacheBuilderError, Operation};
use tally_model::NumberValue;

use crate::{config::SerializerConfiguration, series::SeriesId};

/// A delta cache construction error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DeltaCacheError {
    /// The configured time-to-live was zero.
    #[snafu(display("delta cache TTL must be greater than zero"))]
    ZeroTtl,

    /// The underlying cache could not be built.
    #[snafu(display("failed to build delta cache: {}", source))]
    Build {
        /// Error source.
        source: CacheBuilderError,
    },
}

/// The state we store for each monotonic cumulative series.
#[derive(Clone, Copy, Debug)]
struct CounterState {
    value: NumberValue,
    timestamp: u64,
    start_timestamp: u64,
}

/// Outcome of submitting a cumulative value to the [`DeltaCache`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeltaResolution {
    /// The change since the previous observation.
    Delta(NumberValue),

    /// First observation of the series. The value is now the baseline.
    FirstObservation(NumberValue),

    /// The series restarted: its value went backwards, its start time changed, or its numeric kind changed. The value
    /// is now the baseline.
    Reset(NumberValue),

    /// The observation is older than the last one seen for the series, and was ignored.
    OutOfOrder,
}

impl DeltaResolution {
    /// Returns the delta, if one could be computed.
    pub fn delta(&self) -> Option<NumberValue> {
        match self {
            Self::Delta(value) => Some(*value),
            _ => None,
        }
    }
}

/// Last observed cumulative value of every monotonic series.
///
/// Entries expire once their series has not been observed for the configured TTL. Expired entries are treated as
/// absent right away, and are removed from memory by [`sweep_expired`][Self::sweep_expired] or by running the future
/// returned from [`expiration_driver`][Self::expiration_driver].
///
/// The cache is cheaply cloneable, and all clones share the same state. Resolving a value is atomic for each series:
/// concurrent observations of the same series are applied one after the other, never interleaved.
#[derive(Clone)]
pub struct DeltaCache {
    points: Cache<SeriesId, CounterState>,
}

impl DeltaCache {
    /// Creates a new `DeltaCache` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the TTL is zero, an error is returned.
    pub fn from_configuration(config: &SerializerConfiguration) -> Result<Self, DeltaCacheError> {
        Self::with_clock(config, Clock::new())
    }

    /// Creates a new `DeltaCache` from the given configuration, reading time from the given clock.
    ///
    /// # Errors
    ///
    /// If the TTL is zero, an error is returned.
    pub fn with_clock(config: &SerializerConfiguration, clock: Clock) -> Result<Self, DeltaCacheError> {
        let ttl = config.delta_ttl();
        if ttl.is_zero() {
            return Err(DeltaCacheError::ZeroTtl);
        }

        // A zero sweep interval would spin the expiration driver.
        let sweep_interval = config.sweep_interval().max(Duration::from_secs(1));

        let points = CacheBuilder::from_identifier("tally/delta/number_points")
            .context(Build)?
            .with_capacity(config.cache_capacity())
            .with_time_to_idle(Some(ttl))
            .with_expiration_interval(sweep_interval)
            .with_clock(clock)
            .build();

        Ok(Self { points })
    }

    /// Creates a new `DeltaCache` for tests, with no expiration.
    pub fn for_tests() -> Self {
        Self {
            points: CacheBuilder::for_tests().build(),
        }
    }

    /// Submits a cumulative value with an unknown start time.
    ///
    /// See [`resolve`][Self::resolve].
    pub fn resolve_delta(&self, series: &SeriesId, value: NumberValue, timestamp: u64) -> DeltaResolution {
        self.resolve(series, 0, timestamp, value)
    }

    /// Submits a cumulative value for the given series and returns how it relates to the previous one.
    ///
    /// `start_timestamp` is the start of the series' accumulation window, or zero if unknown. When known, a start time
    /// that differs from the cached one, or that equals `timestamp`, marks a reset. Observations strictly older than the
    /// cached one are ignored and leave the cache unchanged. Every other outcome replaces the cached value.
    pub fn resolve(&self, series: &SeriesId, start_timestamp: u64, timestamp: u64, value: NumberValue) -> DeltaResolution {
        let current = CounterState {
            value,
            timestamp,
            start_timestamp,
        };

        let mut resolution = DeltaResolution::OutOfOrder;
        self.points.compute(series.clone(), |previous| {
            let Some(previous) = previous else {
                resolution = DeltaResolution::FirstObservation(value);
                return Operation::Insert(current);
            };

            if timestamp < previous.timestamp {
                resolution = DeltaResolution::OutOfOrder;
                return Operation::Keep;
            }

            resolution = if !is_not_first_point(start_timestamp, timestamp, previous.start_timestamp) {
                DeltaResolution::Reset(value)
            } else {
                match monotonic_delta(previous.value, value) {
                    Some(delta) => DeltaResolution::Delta(delta),
                    None => DeltaResolution::Reset(value),
                }
            };
            Operation::Insert(current)
        });

        resolution
    }

    /// Returns the number of series currently tracked, including expired series not yet swept.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if no series are tracked.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Removes all expired series, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.points.sweep_expired()
    }

    /// Returns a future which periodically sweeps expired series, completing once the cache is dropped.
    ///
    /// Returns `None` if the cache has no expiration, as is the case for [`for_tests`][Self::for_tests].
    pub fn expiration_driver(&self) -> Option<impl Future<Output = ()> + Send + 'static> {
        self.points.expiration_driver()
    }
}

/// Returns the non-negative change from `previous` to `current`, or `None` if the series went backwards, changed its
/// numeric kind, or the change cannot be represented.
fn monotonic_delta(previous: NumberValue, current: NumberValue) -> Option<NumberValue> {
    let delta = match (previous, current) {
        (NumberValue::Int(previous), NumberValue::Int(current)) if current >= previous => {
            NumberValue::Int(current.checked_sub(previous)?)
        }
        (NumberValue::Double(previous), NumberValue::Double(current)) if current >= previous => {
            let delta = current - previous;
            if !delta.is_finite() {
                return None;
            }
            NumberValue::Double(delta)
        }
        _ => return None,
    };

    debug_assert!(delta.as_f64() >= 0.0, "monotonic delta must not be negative");
    Some(delta)
}

/// Determines if this is NOT the first point of a cumulative series, following the reset and gap rules for cumulative
/// streams:
///
/// - an unknown (zero) start time never marks a reset
/// - a start time equal to the point's own timestamp begins a new sequence
/// - otherwise, the sequence continues only while the start time matches the one first observed
fn is_not_first_point(start_ts: u64, ts: u64, old_start_ts: u64) -> bool {
    if start_ts == 0 {
        return true;
    }

    start_ts != ts && start_ts == old_start_ts
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::dimensions::DimensionList;

    struct Point {
        start_ts: u64,
        ts: u64,
        value: i64,
        expected: DeltaResolution,
        message: &'static str,
    }

    fn series(name: &str) -> SeriesId {
        SeriesId::new(name, &DimensionList::new(), &DimensionList::new())
    }

    fn run_points(cache: &DeltaCache, series: &SeriesId, points: Vec<Point>) {
        for point in points {
            let resolution = cache.resolve(series, point.start_ts, point.ts, NumberValue::Int(point.value));
            assert_eq!(resolution, point.expected, "{}", point.message);
        }
    }

    #[test]
    fn delta_then_reset() {
        let cache = DeltaCache::for_tests();
        let series = series("requests");

        let first = cache.resolve_delta(&series, NumberValue::Int(10), 1);
        assert_eq!(first, DeltaResolution::FirstObservation(NumberValue::Int(10)));
        assert_eq!(first.delta(), None);

        let second = cache.resolve_delta(&series, NumberValue::Int(15), 2);
        assert_eq!(second.delta(), Some(NumberValue::Int(5)));

        let third = cache.resolve_delta(&series, NumberValue::Int(12), 3);
        assert_eq!(third, DeltaResolution::Reset(NumberValue::Int(12)));
        assert_eq!(third.delta(), None);

        // Rebased to 12.
        let fourth = cache.resolve_delta(&series, NumberValue::Int(20), 4);
        assert_eq!(fourth.delta(), Some(NumberValue::Int(8)));
    }

    #[test]
    fn unknown_start_time() {
        let cache = DeltaCache::for_tests();
        let series = series("test");

        run_points(
            &cache,
            &series,
            vec![
                Point {
                    start_ts: 0,
                    ts: 2,
                    value: 5,
                    expected: DeltaResolution::FirstObservation(NumberValue::Int(5)),
                    message: "first point",
                },
                Point {
                    start_ts: 0,
                    ts: 1,
                    value: 9,
                    expected: DeltaResolution::OutOfOrder,
                    message: "new ts < old ts",
                },
                Point {
                    start_ts: 0,
                    ts: 2,
                    value: 6,
                    expected: DeltaResolution::Delta(NumberValue::Int(1)),
                    message: "new ts == old ts",
                },
                Point {
                    start_ts: 0,
                    ts: 3,
                    value: 2,
                    expected: DeltaResolution::Reset(NumberValue::Int(2)),
                    message: "new < old => reset",
                },
                Point {
                    start_ts: 0,
                    ts: 4,
                    value: 6,
                    expected: DeltaResolution::Delta(NumberValue::Int(4)),
                    message: "valid point",
                },
            ],
        );
    }

    #[test]
    fn known_start_time() {
        let cache = DeltaCache::for_tests();
        let series = series("test");

        run_points(
            &cache,
            &series,
            vec![
                Point {
                    start_ts: 1,
                    ts: 2,
                    value: 5,
                    expected: DeltaResolution::FirstObservation(NumberValue::Int(5)),
                    message: "first point",
                },
                Point {
                    start_ts: 1,
                    ts: 3,
                    value: 7,
                    expected: DeltaResolution::Delta(NumberValue::Int(2)),
                    message: "same start time",
                },
                Point {
                    start_ts: 4,
                    ts: 4,
                    value: 8,
                    expected: DeltaResolution::Reset(NumberValue::Int(8)),
                    message: "start time == ts, new sequence",
                },
                Point {
                    start_ts: 4,
                    ts: 6,
                    value: 12,
                    expected: DeltaResolution::Delta(NumberValue::Int(4)),
                    message: "same start time after reset",
                },
                Point {
                    start_ts: 8,
                    ts: 9,
                    value: 20,
                    expected: DeltaResolution::Reset(NumberValue::Int(20)),
                    message: "start time changed, even though the value increased",
                },
            ],
        );
    }

    #[test]
    fn kind_change_is_reset() {
        let cache = DeltaCache::for_tests();
        let series = series("kind");

        cache.resolve_delta(&series, NumberValue::Int(10), 1);
        assert_eq!(
            cache.resolve_delta(&series, NumberValue::Double(11.5), 2),
            DeltaResolution::Reset(NumberValue::Double(11.5))
        );
        assert_eq!(
            cache.resolve_delta(&series, NumberValue::Double(12.0), 3),
            DeltaResolution::Delta(NumberValue::Double(0.5))
        );
    }

    #[test]
    fn series_are_independent() {
        let cache = DeltaCache::for_tests();
        let a = series("a");
        let b = series("b");

        cache.resolve_delta(&a, NumberValue::Int(1), 1);
        cache.resolve_delta(&b, NumberValue::Int(100), 1);
        assert_eq!(cache.resolve_delta(&a, NumberValue::Int(3), 2).delta(), Some(NumberValue::Int(2)));
        assert_eq!(cache.resolve_delta(&b, NumberValue::Int(150), 2).delta(), Some(NumberValue::Int(50)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalid_configuration() {
        let config = SerializerConfiguration::with_defaults().with_delta_ttl(Duration::ZERO);
        assert!(matches!(DeltaCache::from_configuration(&config), Err(DeltaCacheError::ZeroTtl)));
    }

    #[test]
    fn overflowing_double_delta_is_reset() {
        let cache = DeltaCache::for_tests();
        let id = series("c");

        let first = cache.resolve_delta(&id, NumberValue::Double(-1.5e308), 1);
        assert_eq!(first, DeltaResolution::FirstObservation(NumberValue::Double(-1.5e308)));

        // The difference does not fit in an f64, so the series starts over from the new value.
        let second = cache.resolve_delta(&id, NumberValue::Double(1.5e308), 2);
        assert_eq!(second, DeltaResolution::Reset(NumberValue::Double(1.5e308)));

        let third = cache.resolve_delta(&id, NumberValue::Double(1.6e308), 3);
        let Some(NumberValue::Double(delta)) = third.delta() else {
            panic!("expected a double delta, got {:?}", third);
        };
        assert!(delta.is_finite() && delta > 0.0);
    }

    #[test]
    fn idle_series_expire() {
        let (clock, mock) = Clock::mock();
        let config = SerializerConfiguration::with_defaults()
            .with_delta_ttl(Duration::from_secs(60))
            .with_cache_capacity(8);
        let cache = DeltaCache::with_clock(&config, clock).unwrap();

        let active = series("active");
        let idle = series("idle");
        cache.resolve_delta(&active, NumberValue::Int(1), 1);
        cache.resolve_delta(&idle, NumberValue::Int(1), 1);

        mock.increment(Duration::from_secs(30));
        assert_eq!(cache.resolve_delta(&active, NumberValue::Int(2), 2).delta(), Some(NumberValue::Int(1)));

        mock.increment(Duration::from_secs(30));
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);

        assert_eq!(
            cache.resolve_delta(&idle, NumberValue::Int(5), 3),
            DeltaResolution::FirstObservation(NumberValue::Int(5))
        );
        assert_eq!(cache.resolve_delta(&active, NumberValue::Int(4), 3).delta(), Some(NumberValue::Int(2)));
    }

    #[test]
    fn concurrent_resolution_matches_sequential() {
        const SERIES: usize = 1000;
        const THREADS: usize = 8;
        const STEPS: i64 = 20;

        let cache = DeltaCache::for_tests();
        let ids = Arc::new((0..SERIES).map(|i| series(&format!("series.{}", i))).collect::<Vec<_>>());

        // Each thread owns an interleaved slice of the series, and all threads hammer the cache at once.
        let handles = (0..THREADS)
            .map(|thread_index| {
                let cache = cache.clone();
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    let mut results = Vec::new();
                    for step in 0..STEPS {
                        for (i, id) in ids.iter().enumerate().skip(thread_index).step_by(THREADS) {
                            let value = (i as i64 + 1) * step * step;
                            let resolution = cache.resolve_delta(id, NumberValue::Int(value), step as u64 + 1);
                            results.push((i, step, resolution));
                        }
                    }
                    results
                })
            })
            .collect::<Vec<_>>();

        let sequential = DeltaCache::for_tests();
        let mut expected = std::collections::HashMap::new();
        for step in 0..STEPS {
            for (i, id) in ids.iter().enumerate() {
                let value = (i as i64 + 1) * step * step;
                expected.insert((i, step), sequential.resolve_delta(id, NumberValue::Int(value), step as u64 + 1));
            }
        }

        let mut checked = 0;
        for handle in handles {
            for (i, step, resolution) in handle.join().unwrap() {
                assert_eq!(Some(&resolution), expected.get(&(i, step)), "series {} step {}", i, step);
                checked += 1;
            }
        }
        assert_eq!(checked, SERIES * STEPS as usize);
        assert_eq!(cache.len(), SERIES);
    }

    #[tokio::test(start_paused = true)]
    async fn expiration_driver_runs_until_dropped() {
        let (clock, mock) = Clock::mock();
        let config = SerializerConfiguration::with_defaults()
            .with_delta_ttl(Duration::from_secs(10))
            .with_sweep_interval(Duration::from_secs(5));
        let cache = DeltaCache::with_clock(&config, clock).unwrap();

        cache.resolve_delta(&series("a"), NumberValue::Int(1), 1);
        mock.increment(Duration::from_secs(10));

        let driver = tokio::spawn(cache.expiration_driver().unwrap());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cache.is_empty());

        drop(cache);
        let result = tokio::time::timeout(Duration::from_secs(30), driver).await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
