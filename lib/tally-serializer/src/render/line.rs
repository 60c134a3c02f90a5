use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt::Write as _,
};

use bytes::Bytes;

use super::{format_double, DuplicateTag, MissingField, RecordRenderer, RenderError};
use crate::document::{Document, FieldValue};

const NAME_FIELD: &str = "name";
const TIMESTAMP_FIELD: &str = "@timestamp";
const ATTRIBUTES_GROUP: &str = "attributes";

/// Renders records as line protocol.
///
/// Each record becomes `<prefix><name>[,<tag>=<value>...] <field>=<value>[,...] <timestamp>`. Groups become tags: keys
/// of the `attributes` group are used as-is, keys of any other group are qualified as `<group>.<key>`. The remaining
/// scalar fields become fields, except for `name` and `@timestamp`, which are written in their own positions. A record
/// whose attribute keys clash with a qualified group key (an attribute named `scope.name`, say) is rejected.
#[derive(Clone, Debug, Default)]
pub struct LineProtocolRenderer {
    metric_prefix: String,
}

impl LineProtocolRenderer {
    /// Creates a new `LineProtocolRenderer` that prepends `metric_prefix` to every metric name.
    pub fn new<S: Into<String>>(metric_prefix: S) -> Self {
        Self {
            metric_prefix: metric_prefix.into(),
        }
    }
}

impl RecordRenderer for LineProtocolRenderer {
    fn render(&self, record: &Document) -> Result<Bytes, RenderError> {
        let canonical = record.canonical();

        let name = match canonical.get(NAME_FIELD) {
            Some(FieldValue::String(name)) if !name.is_empty() => name,
            _ => return MissingField { field: NAME_FIELD }.fail(),
        };
        let timestamp = match canonical.get(TIMESTAMP_FIELD) {
            Some(FieldValue::Timestamp(nanos)) => *nanos,
            _ => return MissingField { field: TIMESTAMP_FIELD }.fail(),
        };

        let mut tags = BTreeMap::new();
        let mut line = String::with_capacity(128);
        let mut field_count = 0;
        for (key, value) in &canonical {
            match value {
                FieldValue::Group(group) => {
                    let prefix = if *key == ATTRIBUTES_GROUP { None } else { Some(*key) };
                    collect_tags(&mut tags, prefix, group)?;
                }
                _ if *key == NAME_FIELD || *key == TIMESTAMP_FIELD => {}
                _ => {
                    // Fields are written after the tags, so stage them in a separate buffer.
                    line.push(if field_count == 0 { ' ' } else { ',' });
                    escape_key(&mut line, key);
                    line.push('=');
                    write_field_value(&mut line, key, value)?;
                    field_count += 1;
                }
            }
        }
        if field_count == 0 {
            return MissingField { field: "value" }.fail();
        }

        let mut out = String::with_capacity(self.metric_prefix.len() + name.len() + line.len() + 64);
        escape_measurement(&mut out, &self.metric_prefix);
        escape_measurement(&mut out, name);
        for (key, value) in &tags {
            out.push(',');
            escape_key(&mut out, key);
            out.push('=');
            escape_key(&mut out, value);
        }
        out.push_str(&line);
        let _ = write!(out, " {}", timestamp);

        Ok(Bytes::from(out))
    }
}

fn collect_tags(tags: &mut BTreeMap<String, String>, prefix: Option<&str>, group: &Document) -> Result<(), RenderError> {
    for (key, value) in group.canonical() {
        let qualified = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.to_string(),
        };

        let text = match value {
            FieldValue::Group(nested) => {
                collect_tags(tags, Some(qualified.as_str()), nested)?;
                continue;
            }
            FieldValue::String(s) => s.clone(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::UInt(n) | FieldValue::Timestamp(n) => n.to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Double(n) => format_double(&mut ryu::Buffer::new(), &qualified, *n)?.to_string(),
        };

        // Empty tag values are not representable.
        if text.is_empty() {
            continue;
        }
        match tags.entry(qualified) {
            Entry::Vacant(entry) => {
                entry.insert(text);
            }
            Entry::Occupied(entry) => return DuplicateTag { tag: entry.key().as_str() }.fail(),
        }
    }
    Ok(())
}

fn write_field_value(out: &mut String, key: &str, value: &FieldValue) -> Result<(), RenderError> {
    match value {
        FieldValue::String(s) => {
            out.push('"');
            for c in s.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
        FieldValue::Int(n) => {
            let _ = write!(out, "{}i", n);
        }
        FieldValue::UInt(n) | FieldValue::Timestamp(n) => {
            let _ = write!(out, "{}u", n);
        }
        FieldValue::Double(n) => out.push_str(format_double(&mut ryu::Buffer::new(), key, *n)?),
        FieldValue::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        FieldValue::Group(_) => {}
    }
    Ok(())
}

fn escape_measurement(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            ',' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}

fn escape_key(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            ',' | '=' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}
