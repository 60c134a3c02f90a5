//! Per-type metric encoders.
//!
//! Encoders turn the data points of a single metric into records. Every outcome is reported in data point order: a
//! record, an error scoped to the point (or bucket, or quantile) that caused it, or a suppression.

use tally_model::{InstrumentationScope, Metric};

use crate::{
    dimensions::DimensionList,
    document::Document,
    error::SerializeError,
    DimensionNormalizer,
};

mod histogram;
pub(crate) use self::histogram::encode_histogram;

mod number;
pub(crate) use self::number::{encode_gauge, encode_sum, SumPolicies};

mod summary;
pub(crate) use self::summary::encode_summary;

/// The outcome of encoding a single record.
#[derive(Debug)]
pub(crate) enum Encoded {
    /// A record ready to be rendered.
    Record(Document),

    /// The record could not be produced.
    Failed(SerializeError),

    /// The data point was intentionally not emitted.
    Suppressed {
        /// Why the point was dropped.
        reason: &'static str,

        /// Timestamp of the dropped point.
        timestamp: u64,
    },
}

/// Everything an encoder needs to know about the metric being encoded.
pub(crate) struct EncodeContext<'a> {
    pub metric: &'a Metric,
    pub resource: &'a DimensionList,
    pub scope: &'a InstrumentationScope,
    pub normalizer: &'a DimensionNormalizer,
    pub attribute_prefix: &'a str,
}

impl EncodeContext<'_> {
    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.metric.name
    }

    /// Creates a record with the fields common to all metric types.
    pub fn base_record(&self, timestamp: u64, metric_type: &'static str, dimensions: &DimensionList) -> Document {
        let mut record = Document::new();
        record.add_timestamp("@timestamp", timestamp);
        record.add_string("name", self.metric.name.as_str());
        record.add_string("type", metric_type);
        if !self.metric.unit.is_empty() {
            record.add_string("unit", self.metric.unit.as_str());
        }

        if self.attribute_prefix.is_empty() {
            record.add_group("attributes", dimensions_to_group(dimensions));
        } else {
            for dimension in dimensions {
                record.add_string(format!("{}{}", self.attribute_prefix, dimension.key), dimension.value.as_str());
            }
        }

        record.add_group("resource", dimensions_to_group(self.resource));

        if !self.scope.name.is_empty() {
            let mut scope = Document::new();
            scope.add_string("name", self.scope.name.as_str());
            if !self.scope.version.is_empty() {
                scope.add_string("version", self.scope.version.as_str());
            }
            record.add_group("scope", scope);
        }

        record
    }

    /// Creates an error for a non-finite value.
    pub fn invalid_value<F: Into<String>>(&self, field: F, value: f64) -> Encoded {
        Encoded::Failed(SerializeError::InvalidNumericValue {
            metric: self.metric.name.clone(),
            field: field.into(),
            value,
        })
    }
}

fn dimensions_to_group(dimensions: &DimensionList) -> Document {
    let mut group = Document::new();
    for dimension in dimensions {
        group.add_string(dimension.key.as_str(), dimension.value.as_str());
    }
    group
}
