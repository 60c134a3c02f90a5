use serde::{Deserialize, Serialize};

/// An ordered list of attributes.
///
/// Duplicate keys are allowed; consumers decide how collisions are resolved.
pub type Attributes = Vec<KeyValue>;

/// An attribute value.
///
/// Serialized in externally tagged form, e.g. `{"string": "eu-west-1"}` or `{"int": 42}`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    /// A UTF-8 string.
    String(String),

    /// A boolean.
    Bool(bool),

    /// A signed 64-bit integer.
    Int(i64),

    /// A double-precision floating-point number.
    Double(f64),

    /// Raw bytes.
    Bytes(Vec<u8>),

    /// An ordered list of values.
    Array(Vec<AttributeValue>),

    /// A nested list of key/value pairs.
    Map(Vec<KeyValue>),

    /// No value.
    #[default]
    Empty,
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// A single attribute.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct KeyValue {
    /// Attribute key.
    pub key: String,

    /// Attribute value.
    #[serde(default)]
    pub value: AttributeValue,
}

impl KeyValue {
    /// Creates a new `KeyValue`.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K, V> From<(K, V)> for KeyValue
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}
