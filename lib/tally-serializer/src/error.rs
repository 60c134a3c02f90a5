use snafu::Snafu;

use crate::render::RenderError;

/// A serialization error.
///
/// Errors are scoped to the single data point, bucket, or quantile that caused them. They are collected alongside the
/// successfully serialized records and never abort the rest of the batch.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum SerializeError {
    /// The metric's kind has no encoder.
    #[snafu(display("metric '{}' has unsupported kind '{}'", metric, kind))]
    UnsupportedMetricKind {
        /// Metric name.
        metric: String,

        /// Kind of the metric.
        kind: &'static str,
    },

    /// The metric itself is invalid.
    #[snafu(display("invalid metric: {}", reason))]
    InvalidMetric {
        /// Why the metric is invalid.
        reason: String,
    },

    /// A data point is structurally invalid.
    #[snafu(display("malformed data point for metric '{}': {}", metric, reason))]
    MalformedDataPoint {
        /// Metric name.
        metric: String,

        /// Why the data point is malformed.
        reason: String,
    },

    /// A numeric value cannot be represented in the output format.
    #[snafu(display("invalid value {} for field '{}' of metric '{}'", value, field, metric))]
    InvalidNumericValue {
        /// Metric name.
        metric: String,

        /// Field holding the value.
        field: String,

        /// Offending value.
        value: f64,
    },

    /// A record could not be rendered.
    #[snafu(display("failed to render record for metric '{}': {}", metric, source))]
    RenderFailure {
        /// Metric name.
        metric: String,

        /// Error source.
        source: RenderError,
    },
}

impl SerializeError {
    /// Wraps a render error for the given metric.
    ///
    /// Non-finite values found while rendering are reported as [`SerializeError::InvalidNumericValue`], the same as
    /// when they are caught by an encoder.
    pub(crate) fn from_render(metric: &str, error: RenderError) -> Self {
        match error {
            RenderError::InvalidNumericValue { field, value } => Self::InvalidNumericValue {
                metric: metric.to_string(),
                field,
                value,
            },
            source => Self::RenderFailure {
                metric: metric.to_string(),
                source,
            },
        }
    }
}
