// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::fmt::{self, Display};

/// Identifies one metric series: `namespace:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// The subsystem the metric belongs to (e.g., "resources").
    pub namespace: String,
    /// The metric's name within its namespace (e.g., "cache_hits").
    pub name: String,
}

impl MetricId {
    /// Creates a `MetricId`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// The three supported metric shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Monotonically increasing count (e.g., cache hits).
    Counter,
    /// Value that moves both ways (e.g., live identities).
    Gauge,
    /// Distribution of samples over fixed buckets (e.g., load time).
    Histogram,
}

/// The current value of a metric.
#[derive(Debug, Clone)]
pub enum MetricValue {
    /// Counter value.
    Counter(u64),
    /// Gauge value.
    Gauge(f64),
    /// Histogram samples and per-bucket counts.
    Histogram {
        /// Every recorded sample.
        samples: Vec<f64>,
        /// Inclusive upper bound of each bucket.
        bucket_bounds: Vec<f64>,
        /// Samples at or below each bound.
        bucket_counts: Vec<u64>,
    },
}

impl MetricValue {
    /// The [`MetricType`] of this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// The value as a counter, if it is one.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a gauge, if it is one.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// Number of recorded samples, if this is a histogram.
    pub fn sample_count(&self) -> Option<usize> {
        match self {
            MetricValue::Histogram { samples, .. } => Some(samples.len()),
            _ => None,
        }
    }
}

/// A metric: its identity, description, unit, and current value.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric's identity.
    pub id: MetricId,
    /// Human-readable description.
    pub description: String,
    /// Unit of measurement (e.g., "ms", "count").
    pub unit: String,
    /// The current value.
    pub value: MetricValue,
}

impl Metric {
    /// A counter starting at zero.
    pub fn counter(id: MetricId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            unit: "count".to_string(),
            value: MetricValue::Counter(0),
        }
    }

    /// A gauge starting at zero.
    pub fn gauge(id: MetricId, description: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            value: MetricValue::Gauge(0.0),
        }
    }

    /// An empty histogram with the given bucket upper bounds.
    pub fn histogram(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> Self {
        let bucket_counts = vec![0; bucket_bounds.len()];
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            value: MetricValue::Histogram {
                samples: Vec::new(),
                bucket_bounds,
                bucket_counts,
            },
        }
    }
}

/// A specialized `Result` type for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised by metric storage and handles.
#[derive(Debug, Clone)]
pub enum MetricsError {
    /// No metric is stored under this ID.
    MetricNotFound(MetricId),
    /// The operation does not apply to the stored metric's type.
    TypeMismatch {
        /// The type the operation needed.
        expected: MetricType,
        /// The type actually stored.
        found: MetricType,
    },
    /// The storage layer failed (e.g., a poisoned lock).
    StorageError(String),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::MetricNotFound(id) => write!(f, "Metric not found: {id}"),
            MetricsError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected:?}, found {found:?}")
            }
            MetricsError::StorageError(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            MetricId::new("resources", "cache_hits").to_string(),
            "resources:cache_hits"
        );
    }

    #[test]
    fn test_constructors_set_types() {
        let id = MetricId::new("t", "m");
        assert_eq!(
            Metric::counter(id.clone(), "c").value.metric_type(),
            MetricType::Counter
        );
        assert_eq!(Metric::gauge(id.clone(), "g", "u").value.as_gauge(), Some(0.0));
        let histogram = Metric::histogram(id, "h", "ms", vec![1.0, 10.0]);
        assert_eq!(histogram.value.sample_count(), Some(0));
    }
}
