use std::time::Duration;

use serde::Deserialize;

use crate::dimensions::DimensionList;

const fn default_delta_ttl_secs() -> u64 {
    60
}

const fn default_sweep_interval_secs() -> u64 {
    30
}

const fn default_cache_capacity() -> usize {
    1024
}

fn default_multi_value_separator() -> String {
    String::from(",")
}

/// Wire format of serialized records.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Compact JSON documents, one per record.
    #[default]
    Json,

    /// Line protocol, one line per record.
    Line,
}

/// What to do when a monotonic cumulative series goes backwards.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CounterResetPolicy {
    /// Drop the point. The new value becomes the baseline for the next delta.
    #[default]
    Suppress,

    /// Emit the new raw value as the delta, assuming the counter restarted from zero.
    EmitRaw,
}

/// What to do with the first observation of a monotonic cumulative series.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InitialValuePolicy {
    /// Drop the point. It only serves as the baseline for the next delta.
    #[default]
    Drop,

    /// Emit the raw cumulative value.
    Keep,
}

/// How monotonic cumulative sums are reported.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SumMode {
    /// Convert to deltas between consecutive observations.
    #[default]
    CumulativeToDelta,

    /// Report the cumulative value as-is.
    RawValue,
}

/// Serializer configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct SerializerConfiguration {
    /// Wire format of serialized records.
    ///
    /// Defaults to `json`.
    #[serde(default)]
    format: OutputFormat,

    /// Dimensions added to every data point, overridden by data point attributes with the same key.
    ///
    /// Defaults to none.
    #[serde(default)]
    default_dimensions: DimensionList,

    /// Dimensions added to every data point, overriding data point attributes with the same key.
    ///
    /// Defaults to none.
    #[serde(default)]
    static_dimensions: DimensionList,

    /// Prefix for flattened dimension fields.
    ///
    /// When empty, dimensions are nested under an `attributes` group. Otherwise, each dimension is written as a
    /// top-level `<prefix><key>` field. Only applies to JSON output: line protocol always writes dimensions as tags.
    ///
    /// Defaults to empty.
    #[serde(default)]
    attribute_prefix: String,

    /// Prefix prepended to the metric name in line protocol output.
    ///
    /// Defaults to empty.
    #[serde(default)]
    metric_prefix: String,

    /// Separator used when an array-valued attribute is converted to a dimension value.
    ///
    /// Defaults to `,`.
    #[serde(default = "default_multi_value_separator")]
    multi_value_separator: String,

    /// How long a series may go without updates before its delta state is evicted, in seconds.
    ///
    /// The next observation of an evicted series is treated as a first observation.
    ///
    /// Defaults to 60 seconds.
    #[serde(default = "default_delta_ttl_secs")]
    delta_ttl_secs: u64,

    /// How often evicted delta state is swept from memory, in seconds.
    ///
    /// Defaults to 30 seconds.
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,

    /// What to do when a monotonic cumulative series goes backwards.
    ///
    /// Defaults to `suppress`.
    #[serde(default)]
    counter_reset_policy: CounterResetPolicy,

    /// What to do with the first observation of a monotonic cumulative series.
    ///
    /// Defaults to `drop`.
    #[serde(default)]
    initial_value_policy: InitialValuePolicy,

    /// How monotonic cumulative sums are reported.
    ///
    /// Defaults to `cumulative_to_delta`.
    #[serde(default)]
    sum_mode: SumMode,

    /// Number of series the delta cache has room for before it first grows.
    ///
    /// Defaults to 1024.
    #[serde(default = "default_cache_capacity")]
    cache_capacity: usize,
}

impl SerializerConfiguration {
    /// Creates a new `SerializerConfiguration` with default values.
    pub fn with_defaults() -> Self {
        Self {
            format: OutputFormat::default(),
            default_dimensions: DimensionList::default(),
            static_dimensions: DimensionList::default(),
            attribute_prefix: String::new(),
            metric_prefix: String::new(),
            multi_value_separator: default_multi_value_separator(),
            delta_ttl_secs: default_delta_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            counter_reset_policy: CounterResetPolicy::default(),
            initial_value_policy: InitialValuePolicy::default(),
            sum_mode: SumMode::default(),
            cache_capacity: default_cache_capacity(),
        }
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the default dimensions.
    pub fn with_default_dimensions(mut self, dimensions: DimensionList) -> Self {
        self.default_dimensions = dimensions;
        self
    }

    /// Sets the static dimensions.
    pub fn with_static_dimensions(mut self, dimensions: DimensionList) -> Self {
        self.static_dimensions = dimensions;
        self
    }

    /// Sets the attribute prefix.
    pub fn with_attribute_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.attribute_prefix = prefix.into();
        self
    }

    /// Sets the line protocol metric name prefix.
    pub fn with_metric_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.metric_prefix = prefix.into();
        self
    }

    /// Sets the separator for array-valued attributes.
    pub fn with_multi_value_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.multi_value_separator = separator.into();
        self
    }

    /// Sets the delta cache TTL.
    pub fn with_delta_ttl(mut self, ttl: Duration) -> Self {
        self.delta_ttl_secs = ttl.as_secs();
        self
    }

    /// Sets the delta cache sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs();
        self
    }

    /// Sets the counter reset policy.
    pub fn with_counter_reset_policy(mut self, policy: CounterResetPolicy) -> Self {
        self.counter_reset_policy = policy;
        self
    }

    /// Sets the initial value policy.
    pub fn with_initial_value_policy(mut self, policy: InitialValuePolicy) -> Self {
        self.initial_value_policy = policy;
        self
    }

    /// Sets the sum mode.
    pub fn with_sum_mode(mut self, sum_mode: SumMode) -> Self {
        self.sum_mode = sum_mode;
        self
    }

    /// Sets the initial capacity of the delta cache.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Returns the output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Returns the delta cache TTL.
    pub fn delta_ttl(&self) -> Duration {
        Duration::from_secs(self.delta_ttl_secs)
    }

    /// Returns the delta cache sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub(crate) fn default_dimensions(&self) -> &DimensionList {
        &self.default_dimensions
    }

    pub(crate) fn static_dimensions(&self) -> &DimensionList {
        &self.static_dimensions
    }

    pub(crate) fn attribute_prefix(&self) -> &str {
        &self.attribute_prefix
    }

    pub(crate) fn metric_prefix(&self) -> &str {
        &self.metric_prefix
    }

    pub(crate) fn multi_value_separator(&self) -> &str {
        &self.multi_value_separator
    }

    pub(crate) fn counter_reset_policy(&self) -> CounterResetPolicy {
        self.counter_reset_policy
    }

    pub(crate) fn initial_value_policy(&self) -> InitialValuePolicy {
        self.initial_value_policy
    }

    pub(crate) fn sum_mode(&self) -> SumMode {
        self.sum_mode
    }

    pub(crate) fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }
}

impl Default for SerializerConfiguration {
    fn default() -> Self {
        Self::with_defaults()
    }
}
