//! Metric serialization engine.
//!
//! Converts batches of [`ResourceMetrics`][tally_model::ResourceMetrics] into wire records, either compact JSON
//! documents or line protocol. Monotonic cumulative sums are converted to deltas through a [`DeltaCache`], which the
//! host owns and passes in.
#![deny(missing_docs)]

mod config;
pub use self::config::{CounterResetPolicy, InitialValuePolicy, OutputFormat, SerializerConfiguration, SumMode};

pub mod delta;
pub use self::delta::{DeltaCache, DeltaCacheError, DeltaResolution};

pub mod dimensions;
pub use self::dimensions::{Dimension, DimensionList, DimensionNormalizer};

pub mod document;
pub use self::document::{Document, FieldValue};

mod encoders;

mod error;
pub use self::error::SerializeError;

pub mod render;
pub use self::render::{JsonRenderer, LineProtocolRenderer, RecordRenderer, RenderError};

mod serializer;
pub use self::serializer::{MetricSerializer, RecordError, SerializedBatch};

pub mod series;
pub use self::series::SeriesId;
