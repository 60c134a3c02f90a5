//! Metrics and their data points.

use serde::{Deserialize, Serialize};

mod points;
pub use self::points::{
    ExponentialBuckets, ExponentialHistogramDataPoint, HistogramDataPoint, NumberDataPoint, SummaryDataPoint,
    ValueAtQuantile,
};

mod value;
pub use self::value::NumberValue;

/// How the values of a series relate to each other over time.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationTemporality {
    /// Each value is the running total since the start of the series.
    #[default]
    Cumulative,

    /// Each value is the change since the previous report.
    Delta,
}

/// A gauge: instantaneous measurements.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Gauge {
    /// Data points.
    #[serde(default)]
    pub data_points: Vec<NumberDataPoint>,
}

/// A sum: measurements accumulated over time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Sum {
    /// Data points.
    #[serde(default)]
    pub data_points: Vec<NumberDataPoint>,

    /// Whether the sum only ever increases, absent resets.
    #[serde(default)]
    pub is_monotonic: bool,

    /// Temporality of the data points.
    #[serde(default)]
    pub aggregation_temporality: AggregationTemporality,
}

/// A histogram with explicit bucket boundaries.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Histogram {
    /// Data points.
    #[serde(default)]
    pub data_points: Vec<HistogramDataPoint>,

    /// Temporality of the data points.
    #[serde(default)]
    pub aggregation_temporality: AggregationTemporality,
}

/// A summary: precomputed quantiles.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Summary {
    /// Data points.
    #[serde(default)]
    pub data_points: Vec<SummaryDataPoint>,
}

/// A histogram with exponentially scaled bucket boundaries.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExponentialHistogram {
    /// Data points.
    #[serde(default)]
    pub data_points: Vec<ExponentialHistogramDataPoint>,

    /// Temporality of the data points.
    #[serde(default)]
    pub aggregation_temporality: AggregationTemporality,
}

/// The shape of a metric, along with its data points.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricData {
    /// A gauge.
    Gauge(Gauge),

    /// A sum.
    Sum(Sum),

    /// A histogram.
    Histogram(Histogram),

    /// A summary.
    Summary(Summary),

    /// An exponential histogram.
    ExponentialHistogram(ExponentialHistogram),
}

impl MetricData {
    /// Returns the name of the metric kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Gauge(_) => "gauge",
            Self::Sum(_) => "sum",
            Self::Histogram(_) => "histogram",
            Self::Summary(_) => "summary",
            Self::ExponentialHistogram(_) => "exponential_histogram",
        }
    }

    /// Returns the number of data points.
    pub fn data_point_count(&self) -> usize {
        match self {
            Self::Gauge(gauge) => gauge.data_points.len(),
            Self::Sum(sum) => sum.data_points.len(),
            Self::Histogram(histogram) => histogram.data_points.len(),
            Self::Summary(summary) => summary.data_points.len(),
            Self::ExponentialHistogram(histogram) => histogram.data_points.len(),
        }
    }
}

/// A named metric.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Metric {
    /// Metric name. Must not be empty.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Unit of measurement.
    #[serde(default)]
    pub unit: String,

    /// Shape and data points.
    pub data: MetricData,
}

impl Metric {
    /// Creates a new `Metric` with an empty description and unit.
    pub fn new<N: Into<String>>(name: N, data: MetricData) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            data,
        }
    }

    /// Creates a gauge metric.
    pub fn gauge<N: Into<String>>(name: N, data_points: Vec<NumberDataPoint>) -> Self {
        Self::new(name, MetricData::Gauge(Gauge { data_points }))
    }

    /// Creates a sum metric.
    pub fn sum<N: Into<String>>(
        name: N, data_points: Vec<NumberDataPoint>, is_monotonic: bool, aggregation_temporality: AggregationTemporality,
    ) -> Self {
        Self::new(
            name,
            MetricData::Sum(Sum {
                data_points,
                is_monotonic,
                aggregation_temporality,
            }),
        )
    }

    /// Creates a histogram metric with cumulative temporality.
    pub fn histogram<N: Into<String>>(name: N, data_points: Vec<HistogramDataPoint>) -> Self {
        Self::new(
            name,
            MetricData::Histogram(Histogram {
                data_points,
                aggregation_temporality: AggregationTemporality::Cumulative,
            }),
        )
    }

    /// Creates a summary metric.
    pub fn summary<N: Into<String>>(name: N, data_points: Vec<SummaryDataPoint>) -> Self {
        Self::new(name, MetricData::Summary(Summary { data_points }))
    }

    /// Sets the unit.
    pub fn with_unit<U: Into<String>>(mut self, unit: U) -> Self {
        self.unit = unit.into();
        self
    }
}
