//! Output records.

use std::collections::BTreeMap;

use tally_model::NumberValue;

/// The value of a record field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A string.
    String(String),

    /// A signed integer.
    Int(i64),

    /// An unsigned integer.
    UInt(u64),

    /// A floating-point number.
    Double(f64),

    /// A boolean.
    Bool(bool),

    /// A point in time, in nanoseconds since the Unix epoch.
    Timestamp(u64),

    /// A nested group of fields.
    Group(Document),
}

impl From<NumberValue> for FieldValue {
    fn from(value: NumberValue) -> Self {
        match value {
            NumberValue::Int(value) => Self::Int(value),
            NumberValue::Double(value) => Self::Double(value),
        }
    }
}

/// A record: a set of named fields, built up by an encoder and then rendered.
///
/// Fields are kept in the order they were added, and adding a field with an existing name does not remove the earlier
/// one. Renderers work from the [`canonical`][Self::canonical] view, in which names are unique (the last value added
/// wins) and sorted bytewise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    /// Creates an empty `Document`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    pub fn add<K: Into<String>>(&mut self, key: K, value: FieldValue) {
        self.fields.push((key.into(), value));
    }

    /// Adds a string field.
    pub fn add_string<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.add(key, FieldValue::String(value.into()));
    }

    /// Adds a signed integer field.
    pub fn add_int<K: Into<String>>(&mut self, key: K, value: i64) {
        self.add(key, FieldValue::Int(value));
    }

    /// Adds an unsigned integer field.
    pub fn add_uint<K: Into<String>>(&mut self, key: K, value: u64) {
        self.add(key, FieldValue::UInt(value));
    }

    /// Adds a floating-point field.
    pub fn add_double<K: Into<String>>(&mut self, key: K, value: f64) {
        self.add(key, FieldValue::Double(value));
    }

    /// Adds a boolean field.
    pub fn add_bool<K: Into<String>>(&mut self, key: K, value: bool) {
        self.add(key, FieldValue::Bool(value));
    }

    /// Adds a timestamp field.
    pub fn add_timestamp<K: Into<String>>(&mut self, key: K, unix_nanos: u64) {
        self.add(key, FieldValue::Timestamp(unix_nanos));
    }

    /// Adds a numeric field, keeping the integer or floating-point kind of the value.
    pub fn add_number<K: Into<String>>(&mut self, key: K, value: NumberValue) {
        self.add(key, FieldValue::from(value));
    }

    /// Adds a nested group, unless it is empty.
    pub fn add_group<K: Into<String>>(&mut self, key: K, group: Document) {
        if !group.is_empty() {
            self.add(key, FieldValue::Group(group));
        }
    }

    /// Returns the value most recently added under `key`.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().rev().find(|(k, _)| k == key).map(|(_, value)| value)
    }

    /// Returns the number of fields added, including duplicates.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields have been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields with unique names, sorted bytewise by name.
    ///
    /// When a name was added more than once, the last value wins. Nested groups are not canonicalized; renderers call
    /// this on each group as they descend.
    pub fn canonical(&self) -> BTreeMap<&str, &FieldValue> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value)).collect()
    }
}
