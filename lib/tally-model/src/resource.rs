use serde::{Deserialize, Serialize};

use crate::{Attributes, Metric};

/// The library or component that produced a set of metrics.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct InstrumentationScope {
    /// Scope name. Empty when unknown.
    #[serde(default)]
    pub name: String,

    /// Scope version.
    #[serde(default)]
    pub version: String,
}

impl InstrumentationScope {
    /// Creates a new `InstrumentationScope`.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, version: V) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Metrics produced by a single instrumentation scope.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ScopeMetrics {
    /// Producing scope.
    #[serde(default)]
    pub scope: InstrumentationScope,

    /// Metrics, in production order.
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

/// Metrics produced by a single resource, such as a host or a process.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResourceMetrics {
    /// Attributes describing the resource.
    #[serde(default)]
    pub resource: Attributes,

    /// Metrics grouped by producing scope.
    #[serde(default)]
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Creates a `ResourceMetrics` holding a single scope.
    pub fn single_scope(resource: Attributes, scope: InstrumentationScope, metrics: Vec<Metric>) -> Self {
        Self {
            resource,
            scope_metrics: vec![ScopeMetrics { scope, metrics }],
        }
    }

    /// Returns the total number of metrics across all scopes.
    pub fn metric_count(&self) -> usize {
        self.scope_metrics.iter().map(|scope| scope.metrics.len()).sum()
    }
}
