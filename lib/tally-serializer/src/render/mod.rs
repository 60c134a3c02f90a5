//! Record renderers.

use std::io;

use bytes::Bytes;
use snafu::Snafu;

use crate::{config::OutputFormat, document::Document, SerializerConfiguration};

mod json;
pub use self::json::JsonRenderer;

mod line;
pub use self::line::LineProtocolRenderer;

/// A render error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum RenderError {
    /// A numeric value cannot be represented in the output format.
    #[snafu(display("field '{}' has non-finite value {}", field, value))]
    InvalidNumericValue {
        /// Field holding the value.
        field: String,

        /// Offending value.
        value: f64,
    },

    /// A field required by the output format is missing or has the wrong type.
    #[snafu(display("record is missing required field '{}'", field))]
    MissingField {
        /// Name of the field.
        field: &'static str,
    },

    /// Two fields of a record map to the same line protocol tag.
    #[snafu(display("more than one field maps to tag '{}'", tag))]
    DuplicateTag {
        /// The clashing tag key.
        tag: String,
    },

    /// A timestamp is outside the range the output format can represent.
    #[snafu(display("field '{}' has out-of-range timestamp {}", field, nanos))]
    InvalidTimestamp {
        /// Field holding the timestamp.
        field: String,

        /// Timestamp, in nanoseconds since the Unix epoch.
        nanos: u64,
    },

    /// Failed to encode a string as JSON.
    #[snafu(display("failed to encode JSON string: {}", source))]
    Json {
        /// Error source.
        source: serde_json::Error,
    },

    /// Failed to write to the output buffer.
    #[snafu(display("failed to write record: {}", source))]
    Io {
        /// Error source.
        source: io::Error,
    },
}

/// Renders records into their wire format.
///
/// Renderers see the [canonical][Document::canonical] view of a record, so the same record always renders to the same
/// bytes. A record that fails to render produces no output at all.
pub trait RecordRenderer {
    /// Renders a single record.
    ///
    /// # Errors
    ///
    /// If the record contains a value that cannot be represented in the output format, or is missing a field the
    /// format requires, an error is returned.
    fn render(&self, record: &Document) -> Result<Bytes, RenderError>;
}

/// Creates the renderer for the configured output format.
pub fn renderer_for(config: &SerializerConfiguration) -> Box<dyn RecordRenderer + Send + Sync> {
    match config.format() {
        OutputFormat::Json => Box::new(JsonRenderer),
        OutputFormat::Line => Box::new(LineProtocolRenderer::new(config.metric_prefix())),
    }
}

/// Converts a timestamp to a [`chrono`] timestamp, if it is representable.
fn to_datetime(field: &str, nanos: u64) -> Result<chrono::DateTime<chrono::Utc>, RenderError> {
    match i64::try_from(nanos) {
        Ok(nanos) => Ok(chrono::DateTime::from_timestamp_nanos(nanos)),
        Err(_) => InvalidTimestamp { field, nanos }.fail(),
    }
}

/// Formats a double in its shortest round-trip form.
///
/// Integral values drop the fractional part (`1`, not `1.0`) and very large or small magnitudes use an exponent
/// (`1e300`). Non-finite values are rejected.
fn format_double<'b>(buf: &'b mut ryu::Buffer, field: &str, value: f64) -> Result<&'b str, RenderError> {
    if !value.is_finite() {
        return InvalidNumericValue { field, value }.fail();
    }

    let formatted = buf.format_finite(value);
    Ok(formatted.strip_suffix(".0").unwrap_or(formatted))
}
