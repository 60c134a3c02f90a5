//! Dimension merging.
//!
//! Every data point is tagged with a dimension set built from three sources, in increasing order of precedence:
//!
//! 1. configured default dimensions
//! 2. the data point's own attributes
//! 3. configured static dimensions
//!
//! When the same key appears more than once, the value from the highest precedence source wins, and the key keeps the
//! position where it first appeared. Within a single source, the last occurrence wins.

use std::{borrow::Cow, fmt, fmt::Write as _};

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use tally_common::collections::FastIndexMap;
use tally_model::{AttributeValue, KeyValue};

use crate::config::SerializerConfiguration;

/// A single key/value dimension.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Dimension {
    /// Dimension key.
    pub key: String,

    /// Dimension value.
    pub value: String,
}

impl Dimension {
    /// Creates a new `Dimension`.
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An ordered list of dimensions.
///
/// Lists built by [`merge_dimensions`] hold unique keys. Lists built by hand may hold duplicates, which are resolved
/// when they are merged.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DimensionList {
    dimensions: Vec<Dimension>,
}

impl DimensionList {
    /// Creates an empty `DimensionList`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a dimension.
    pub fn push<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.dimensions.push(Dimension::new(key, value));
    }

    /// Returns the number of dimensions.
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Returns `true` if there are no dimensions.
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Returns the value of the last dimension with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .rev()
            .find(|dimension| dimension.key == key)
            .map(|dimension| dimension.value.as_str())
    }

    /// Returns an iterator over the dimensions, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Dimension> {
        self.dimensions.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for DimensionList
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            dimensions: iter.into_iter().map(|(key, value)| Dimension::new(key, value)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DimensionList {
    type Item = &'a Dimension;
    type IntoIter = std::slice::Iter<'a, Dimension>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for DimensionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DimensionListVisitor;

        impl<'de> Visitor<'de> for DimensionListVisitor {
            type Value = DimensionList;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of dimension keys to string values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut dimensions = DimensionList::new();
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    dimensions.push(key, value);
                }
                Ok(dimensions)
            }
        }

        deserializer.deserialize_map(DimensionListVisitor)
    }
}

/// Converts an attribute value to its dimension string.
///
/// Strings are used as-is, booleans and numbers use their shortest decimal form, bytes are lowercase hex, arrays join
/// their elements with `separator`, maps are written as compact JSON, and empty values become the empty string.
pub fn attribute_value_to_string<'a>(value: &'a AttributeValue, separator: &str) -> Cow<'a, str> {
    match value {
        AttributeValue::String(s) => Cow::Borrowed(s.as_str()),
        AttributeValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        AttributeValue::Int(i) => Cow::Owned(i.to_string()),
        AttributeValue::Double(d) => Cow::Owned(d.to_string()),
        AttributeValue::Bytes(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2);
            for byte in bytes {
                let _ = write!(hex, "{:02x}", byte);
            }
            Cow::Owned(hex)
        }
        AttributeValue::Array(values) => {
            let mut joined = String::new();
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    joined.push_str(separator);
                }
                joined.push_str(&attribute_value_to_string(value, separator));
            }
            Cow::Owned(joined)
        }
        AttributeValue::Map(entries) => Cow::Owned(map_to_json(entries).to_string()),
        AttributeValue::Empty => Cow::Borrowed(""),
    }
}

fn map_to_json(entries: &[KeyValue]) -> serde_json::Value {
    let object = entries
        .iter()
        .map(|entry| (entry.key.clone(), attribute_value_to_json(&entry.value)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(object)
}

fn attribute_value_to_json(value: &AttributeValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        AttributeValue::String(s) => Value::String(s.clone()),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Int(i) => Value::from(*i),
        // Non-finite doubles become `null`.
        AttributeValue::Double(d) => Value::from(*d),
        AttributeValue::Bytes(_) => Value::String(attribute_value_to_string(value, "").into_owned()),
        AttributeValue::Array(values) => Value::Array(values.iter().map(attribute_value_to_json).collect()),
        AttributeValue::Map(entries) => map_to_json(entries),
        AttributeValue::Empty => Value::Null,
    }
}

/// Merges default dimensions, data point attributes, and static dimensions.
///
/// The result has unique keys. A key's value comes from the highest precedence source it appears in (static over
/// attributes over defaults), and its position is where it first appeared across all three sources.
pub fn merge_dimensions(
    defaults: &DimensionList, attributes: &[KeyValue], statics: &DimensionList, separator: &str,
) -> DimensionList {
    let mut merged: FastIndexMap<&str, Cow<'_, str>> = FastIndexMap::default();

    for dimension in defaults {
        merged.insert(dimension.key.as_str(), Cow::Borrowed(dimension.value.as_str()));
    }
    for attribute in attributes {
        merged.insert(
            attribute.key.as_str(),
            attribute_value_to_string(&attribute.value, separator),
        );
    }
    for dimension in statics {
        merged.insert(dimension.key.as_str(), Cow::Borrowed(dimension.value.as_str()));
    }

    merged
        .into_iter()
        .map(|(key, value)| (key, value.into_owned()))
        .collect()
}

/// Builds the dimension set of each data point from the configured default and static dimensions.
#[derive(Clone, Debug)]
pub struct DimensionNormalizer {
    defaults: DimensionList,
    statics: DimensionList,
    separator: String,
}

impl DimensionNormalizer {
    /// Creates a new `DimensionNormalizer` using `,` to join array values.
    pub fn new(defaults: DimensionList, statics: DimensionList) -> Self {
        Self {
            defaults,
            statics,
            separator: String::from(","),
        }
    }

    /// Creates a new `DimensionNormalizer` from the given configuration.
    pub fn from_configuration(config: &SerializerConfiguration) -> Self {
        Self::new(config.default_dimensions().clone(), config.static_dimensions().clone())
            .with_separator(config.multi_value_separator())
    }

    /// Sets the separator used to join array values.
    pub fn with_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.separator = separator.into();
        self
    }

    /// Merges the configured dimensions with the given attributes.
    pub fn merge(&self, attributes: &[KeyValue]) -> DimensionList {
        merge_dimensions(&self.defaults, attributes, &self.statics, &self.separator)
    }

    /// Converts attributes to a deduplicated dimension list, without applying configured dimensions.
    pub fn normalize(&self, attributes: &[KeyValue]) -> DimensionList {
        merge_dimensions(&DimensionList::new(), attributes, &DimensionList::new(), &self.separator)
    }
}
