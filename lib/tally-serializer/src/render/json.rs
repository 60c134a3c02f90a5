use std::io::Write as _;

use bytes::Bytes;
use chrono::SecondsFormat;
use snafu::ResultExt as _;

use super::{format_double, to_datetime, Io, Json, RecordRenderer, RenderError};
use crate::document::{Document, FieldValue};

const INITIAL_BUF_CAPACITY: usize = 256;

/// Renders records as compact JSON objects.
///
/// Keys are written in sorted order at every level of nesting. Doubles use the shortest decimal form that round-trips
/// (`1`, not `1.0`) and timestamps are written as RFC 3339 strings with nanosecond precision.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonRenderer;

impl RecordRenderer for JsonRenderer {
    fn render(&self, record: &Document) -> Result<Bytes, RenderError> {
        let mut buf = Vec::with_capacity(INITIAL_BUF_CAPACITY);
        write_object(&mut buf, record)?;
        Ok(Bytes::from(buf))
    }
}

fn write_object(buf: &mut Vec<u8>, document: &Document) -> Result<(), RenderError> {
    buf.push(b'{');
    for (i, (key, value)) in document.canonical().into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        write_string(buf, key)?;
        buf.push(b':');
        write_value(buf, key, value)?;
    }
    buf.push(b'}');
    Ok(())
}

fn write_value(buf: &mut Vec<u8>, key: &str, value: &FieldValue) -> Result<(), RenderError> {
    match value {
        FieldValue::String(s) => write_string(buf, s),
        FieldValue::Int(n) => write!(buf, "{}", n).context(Io),
        FieldValue::UInt(n) => write!(buf, "{}", n).context(Io),
        FieldValue::Double(n) => {
            buf.extend_from_slice(format_double(&mut ryu::Buffer::new(), key, *n)?.as_bytes());
            Ok(())
        }
        FieldValue::Bool(b) => {
            buf.extend_from_slice(if *b { b"true" } else { b"false" });
            Ok(())
        }
        FieldValue::Timestamp(nanos) => {
            let formatted = to_datetime(key, *nanos)?.to_rfc3339_opts(SecondsFormat::Nanos, true);
            write_string(buf, &formatted)
        }
        FieldValue::Group(group) => write_object(buf, group),
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<(), RenderError> {
    serde_json::to_writer(buf, s).context(Json)
}
