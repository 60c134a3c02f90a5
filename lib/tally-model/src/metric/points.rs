use serde::{Deserialize, Serialize};

use super::NumberValue;
use crate::Attributes;

/// A single gauge or sum observation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NumberDataPoint {
    /// Point attributes.
    #[serde(default)]
    pub attributes: Attributes,

    /// Start of the accumulation window, in nanoseconds since the Unix epoch. Zero when unknown.
    #[serde(default)]
    pub start_time_unix_nano: u64,

    /// Observation time, in nanoseconds since the Unix epoch.
    pub time_unix_nano: u64,

    /// Observed value.
    pub value: NumberValue,
}

impl NumberDataPoint {
    /// Creates a new `NumberDataPoint` with no attributes and an unknown start time.
    pub fn new<V: Into<NumberValue>>(time_unix_nano: u64, value: V) -> Self {
        Self {
            attributes: Attributes::new(),
            start_time_unix_nano: 0,
            time_unix_nano,
            value: value.into(),
        }
    }

    /// Sets the point attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the start of the accumulation window.
    pub fn with_start_time(mut self, start_time_unix_nano: u64) -> Self {
        self.start_time_unix_nano = start_time_unix_nano;
        self
    }
}

/// A histogram observation with explicit bucket boundaries.
///
/// `bucket_counts` holds one more entry than `explicit_bounds`: bucket `i` counts values at or below
/// `explicit_bounds[i]`, and the final bucket counts everything above the last bound.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistogramDataPoint {
    /// Point attributes.
    #[serde(default)]
    pub attributes: Attributes,

    /// Start of the accumulation window, in nanoseconds since the Unix epoch.
    #[serde(default)]
    pub start_time_unix_nano: u64,

    /// Observation time, in nanoseconds since the Unix epoch.
    pub time_unix_nano: u64,

    /// Total number of observed values.
    pub count: u64,

    /// Sum of all observed values.
    #[serde(default)]
    pub sum: f64,

    /// Upper bounds of the explicit buckets, strictly increasing.
    #[serde(default)]
    pub explicit_bounds: Vec<f64>,

    /// Per-bucket counts.
    #[serde(default)]
    pub bucket_counts: Vec<u64>,
}

impl HistogramDataPoint {
    /// Creates a new `HistogramDataPoint` with no attributes.
    pub fn new(time_unix_nano: u64, count: u64, sum: f64, explicit_bounds: Vec<f64>, bucket_counts: Vec<u64>) -> Self {
        Self {
            attributes: Attributes::new(),
            start_time_unix_nano: 0,
            time_unix_nano,
            count,
            sum,
            explicit_bounds,
            bucket_counts,
        }
    }

    /// Sets the point attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// The value of a summary at a given quantile.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValueAtQuantile {
    /// Quantile, expected within `[0, 1]`.
    pub quantile: f64,

    /// Value at the quantile.
    pub value: f64,
}

impl ValueAtQuantile {
    /// Creates a new `ValueAtQuantile`.
    pub const fn new(quantile: f64, value: f64) -> Self {
        Self { quantile, value }
    }
}

/// A summary observation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SummaryDataPoint {
    /// Point attributes.
    #[serde(default)]
    pub attributes: Attributes,

    /// Start of the accumulation window, in nanoseconds since the Unix epoch.
    #[serde(default)]
    pub start_time_unix_nano: u64,

    /// Observation time, in nanoseconds since the Unix epoch.
    pub time_unix_nano: u64,

    /// Total number of observed values.
    pub count: u64,

    /// Sum of all observed values.
    #[serde(default)]
    pub sum: f64,

    /// Values at each reported quantile.
    #[serde(default)]
    pub quantile_values: Vec<ValueAtQuantile>,
}

impl SummaryDataPoint {
    /// Creates a new `SummaryDataPoint` with no attributes.
    pub fn new(time_unix_nano: u64, count: u64, sum: f64, quantile_values: Vec<ValueAtQuantile>) -> Self {
        Self {
            attributes: Attributes::new(),
            start_time_unix_nano: 0,
            time_unix_nano,
            count,
            sum,
            quantile_values,
        }
    }

    /// Sets the point attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A contiguous run of exponential histogram buckets.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExponentialBuckets {
    /// Index of the first bucket.
    #[serde(default)]
    pub offset: i32,

    /// Per-bucket counts, starting at `offset`.
    #[serde(default)]
    pub bucket_counts: Vec<u64>,
}

/// An exponential histogram observation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ExponentialHistogramDataPoint {
    /// Point attributes.
    #[serde(default)]
    pub attributes: Attributes,

    /// Start of the accumulation window, in nanoseconds since the Unix epoch.
    #[serde(default)]
    pub start_time_unix_nano: u64,

    /// Observation time, in nanoseconds since the Unix epoch.
    pub time_unix_nano: u64,

    /// Total number of observed values.
    pub count: u64,

    /// Sum of all observed values.
    #[serde(default)]
    pub sum: f64,

    /// Resolution of the bucket boundaries.
    #[serde(default)]
    pub scale: i32,

    /// Count of values that are exactly zero.
    #[serde(default)]
    pub zero_count: u64,

    /// Buckets for positive values.
    #[serde(default)]
    pub positive: ExponentialBuckets,

    /// Buckets for negative values.
    #[serde(default)]
    pub negative: ExponentialBuckets,
}
