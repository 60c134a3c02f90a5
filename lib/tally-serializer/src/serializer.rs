use bytes::Bytes;
use tally_model::{Attributes, InstrumentationScope, Metric, MetricData, ResourceMetrics};
use tracing::{debug, trace};

use crate::{
    delta::DeltaCache,
    dimensions::{DimensionList, DimensionNormalizer},
    encoders::{encode_gauge, encode_histogram, encode_sum, encode_summary, EncodeContext, Encoded, SumPolicies},
    error::SerializeError,
    render::{renderer_for, RecordRenderer},
    OutputFormat, SerializerConfiguration,
};

/// A serialization error, tagged with the position of the record it belongs to.
#[derive(Debug)]
pub struct RecordError {
    /// Ordinal of the failed record among all records attempted in the batch, successful or not.
    pub index: usize,

    /// The error.
    pub error: SerializeError,
}

/// The result of serializing a batch.
///
/// Records and errors are both reported in input order: resources, then scopes, then metrics, then data points, then
/// buckets or quantiles. Suppressed data points are only counted, and do not take up an index.
#[derive(Debug, Default)]
pub struct SerializedBatch {
    /// Serialized records.
    pub records: Vec<Bytes>,

    /// Errors for the records that could not be serialized.
    pub errors: Vec<RecordError>,

    /// Number of data points that were intentionally not emitted.
    pub suppressed: usize,
}

impl SerializedBatch {
    /// Returns the number of records attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.records.len() + self.errors.len()
    }

    fn push_record(&mut self, record: Bytes) {
        self.records.push(record);
    }

    fn push_error(&mut self, error: SerializeError) {
        let index = self.attempted();
        self.errors.push(RecordError { index, error });
    }
}

/// Serializes metrics into wire records.
///
/// The serializer holds no per-batch state: every method takes `&self`, and independent batches can be serialized
/// concurrently. The only state shared between batches is the [`DeltaCache`], which is owned by the caller and passed
/// in at construction.
pub struct MetricSerializer {
    normalizer: DimensionNormalizer,
    delta_cache: DeltaCache,
    renderer: Box<dyn RecordRenderer + Send + Sync>,
    attribute_prefix: String,
    policies: SumPolicies,
}

impl MetricSerializer {
    /// Creates a new `MetricSerializer` from the given configuration.
    ///
    /// Records are rendered in the configured output format. `delta_cache` holds the state used to convert monotonic
    /// cumulative sums to deltas, and may be shared with other serializers.
    pub fn new(config: &SerializerConfiguration, delta_cache: DeltaCache) -> Self {
        // Line protocol writes dimensions as tags, so they are never flattened into fields.
        let attribute_prefix = match config.format() {
            OutputFormat::Json => config.attribute_prefix().to_string(),
            OutputFormat::Line => String::new(),
        };

        Self {
            normalizer: DimensionNormalizer::from_configuration(config),
            delta_cache,
            renderer: renderer_for(config),
            attribute_prefix,
            policies: SumPolicies {
                sum_mode: config.sum_mode(),
                counter_reset: config.counter_reset_policy(),
                initial_value: config.initial_value_policy(),
            },
        }
    }

    /// Replaces the renderer.
    pub fn with_renderer<R>(mut self, renderer: R) -> Self
    where
        R: RecordRenderer + Send + Sync + 'static,
    {
        self.renderer = Box::new(renderer);
        self
    }

    /// Returns the delta cache.
    pub fn delta_cache(&self) -> &DeltaCache {
        &self.delta_cache
    }

    /// Serializes a batch of metrics.
    ///
    /// Failures are scoped to the record that caused them, and never prevent the rest of the batch from being
    /// serialized.
    pub fn serialize_batch(&self, batch: &[ResourceMetrics]) -> SerializedBatch {
        let mut serialized = SerializedBatch::default();
        for resource_metrics in batch {
            let resource = self.normalizer.normalize(&resource_metrics.resource);
            for scope_metrics in &resource_metrics.scope_metrics {
                for metric in &scope_metrics.metrics {
                    self.serialize_metric_into(metric, &scope_metrics.scope, &resource, &mut serialized);
                }
            }
        }

        debug!(
            resources = batch.len(),
            metrics = batch.iter().map(ResourceMetrics::metric_count).sum::<usize>(),
            records = serialized.records.len(),
            errors = serialized.errors.len(),
            suppressed = serialized.suppressed,
            "Serialized batch."
        );

        serialized
    }

    /// Serializes a single metric.
    pub fn serialize_metric(
        &self, metric: &Metric, scope: &InstrumentationScope, resource: &Attributes,
    ) -> SerializedBatch {
        let resource = self.normalizer.normalize(resource);
        let mut serialized = SerializedBatch::default();
        self.serialize_metric_into(metric, scope, &resource, &mut serialized);
        serialized
    }

    fn serialize_metric_into(
        &self, metric: &Metric, scope: &InstrumentationScope, resource: &DimensionList, serialized: &mut SerializedBatch,
    ) {
        if metric.name.is_empty() {
            serialized.push_error(SerializeError::InvalidMetric {
                reason: "metric name is empty".to_string(),
            });
            return;
        }

        let ctx = EncodeContext {
            metric,
            resource,
            scope,
            normalizer: &self.normalizer,
            attribute_prefix: &self.attribute_prefix,
        };

        let mut outcomes = Vec::with_capacity(metric.data.data_point_count());
        match &metric.data {
            MetricData::Gauge(gauge) => encode_gauge(&ctx, gauge, &mut outcomes),
            MetricData::Sum(sum) => encode_sum(&ctx, sum, &self.delta_cache, self.policies, &mut outcomes),
            MetricData::Histogram(histogram) => encode_histogram(&ctx, histogram, &mut outcomes),
            MetricData::Summary(summary) => encode_summary(&ctx, summary, &mut outcomes),
            MetricData::ExponentialHistogram(_) => outcomes.push(Encoded::Failed(SerializeError::UnsupportedMetricKind {
                metric: metric.name.clone(),
                kind: metric.data.kind(),
            })),
        }

        let (records_before, errors_before, suppressed_before) = (
            serialized.records.len(),
            serialized.errors.len(),
            serialized.suppressed,
        );
        for outcome in outcomes {
            match outcome {
                Encoded::Record(record) => match self.renderer.render(&record) {
                    Ok(rendered) => serialized.push_record(rendered),
                    Err(e) => serialized.push_error(SerializeError::from_render(&metric.name, e)),
                },
                Encoded::Failed(e) => serialized.push_error(e),
                Encoded::Suppressed { reason, timestamp } => {
                    trace!(metric_name = %metric.name, timestamp, reason, "Suppressed data point.");
                    serialized.suppressed += 1;
                }
            }
        }

        debug!(
            metric_name = %metric.name,
            metric_type = metric.data.kind(),
            records = serialized.records.len() - records_before,
            errors = serialized.errors.len() - errors_before,
            suppressed = serialized.suppressed - suppressed_before,
            "Serialized metric."
        );
    }
}
