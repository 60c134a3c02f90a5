//! Vendor-neutral metric data model.
//!
//! Batches are organized as resources, each holding one or more instrumentation scopes, each holding one or more
//! metrics. All types are plain data: they are built by a producer, borrowed by the serializer, and never mutated
//! during serialization. Every type can be deserialized with `serde`, which is how batches are loaded from JSON.
#![deny(missing_docs)]

mod attributes;
pub use self::attributes::{AttributeValue, Attributes, KeyValue};

pub mod metric;
pub use self::metric::{AggregationTemporality, Metric, MetricData, NumberValue};

mod resource;
pub use self::resource::{InstrumentationScope, ResourceMetrics, ScopeMetrics};
