use serde::{Deserialize, Serialize};

/// A numeric data point value.
///
/// A point carries either an integer or a double, never both.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum NumberValue {
    /// An integer value.
    #[serde(rename = "as_int")]
    Int(i64),

    /// A floating-point value.
    #[serde(rename = "as_double")]
    Double(f64),
}

impl NumberValue {
    /// Returns the value as a double.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(value) => *value as f64,
            Self::Double(value) => *value,
        }
    }

    /// Returns `true` if the value is an integer, or a finite double.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Double(value) => value.is_finite(),
        }
    }
}

impl From<i64> for NumberValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for NumberValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}
