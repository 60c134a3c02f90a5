//! Series identity.

use std::fmt::Write as _;

use crate::dimensions::{Dimension, DimensionList};

/// Identity of a single time series.
///
/// Built from the metric name, the resource dimensions, and the data point dimensions. Dimension order does not
/// matter, while keys and values are compared case-sensitively. Each component is length-prefixed, so two different
/// inputs never produce the same identity regardless of which characters they contain.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SeriesId(String);

impl SeriesId {
    /// Creates the identity of the series with the given name and dimensions.
    pub fn new(name: &str, resource: &DimensionList, dimensions: &DimensionList) -> Self {
        let mut key = String::with_capacity(name.len() + 8 * (resource.len() + dimensions.len() + 1));
        push_component(&mut key, name);
        push_dimensions(&mut key, resource);
        push_dimensions(&mut key, dimensions);
        Self(key)
    }

    /// Returns the canonical encoding of the identity.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_dimensions(key: &mut String, dimensions: &DimensionList) {
    let mut sorted = dimensions.iter().collect::<Vec<&Dimension>>();
    sorted.sort_unstable();

    let _ = write!(key, "{}|", sorted.len());
    for dimension in sorted {
        push_component(key, &dimension.key);
        push_component(key, &dimension.value);
    }
}

fn push_component(key: &mut String, component: &str) {
    let _ = write!(key, "{}:", component.len());
    key.push_str(component);
}
