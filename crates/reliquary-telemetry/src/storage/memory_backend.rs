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


use crate::storage::backend::MetricsBackend;
use reliquary_core::telemetry::{Metric, MetricId, MetricsError, MetricsResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// The default backend: a map behind a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> MetricsError {
    MetricsError::StorageError("metrics storage lock poisoned".to_string())
}

impl MetricsBackend for InMemoryBackend {
    fn put_metric(&self, metric: Metric) -> MetricsResult<()> {
        let mut storage = self.storage.write().map_err(|_| poisoned())?;
        storage.insert(metric.id.clone(), metric);
        Ok(())
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        let storage = self.storage.read().map_err(|_| poisoned())?;
        storage
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn update(
        &self,
        id: &MetricId,
        apply: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()> {
        let mut storage = self.storage.write().map_err(|_| poisoned())?;
        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
        apply(metric)
    }

    fn list_all_metrics(&self) -> Vec<Metric> {
        self.storage
            .read()
            .map(|storage| storage.values().cloned().collect())
            .unwrap_or_default()
    }

    fn metric_count(&self) -> usize {
        self.storage.read().map(|storage| storage.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reliquary_core::telemetry::{MetricType, MetricValue};

    #[test]
    fn test_counter_increments_atomically() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("resources", "loads_total");
        backend.put_metric(Metric::counter(id.clone(), "loads")).unwrap();

        assert_eq!(backend.increment_counter(&id, 1).unwrap(), 1);
        assert_eq!(backend.increment_counter(&id, 4).unwrap(), 5);
        assert_eq!(backend.get_metric(&id).unwrap().value.as_counter(), Some(5));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("resources", "load_time");
        backend
            .put_metric(Metric::histogram(id.clone(), "t", "ms", vec![1.0, 10.0]))
            .unwrap();

        backend.record_histogram_sample(&id, 0.5).unwrap();
        backend.record_histogram_sample(&id, 5.0).unwrap();
        backend.record_histogram_sample(&id, 50.0).unwrap();

        match backend.get_metric(&id).unwrap().value {
            MetricValue::Histogram {
                samples,
                bucket_counts,
                ..
            } => {
                assert_eq!(samples.len(), 3);
                assert_eq!(bucket_counts, vec![1, 2]);
            }
            other => panic!("Expected a histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("resources", "live_identities");
        backend.put_metric(Metric::gauge(id.clone(), "g", "count")).unwrap();

        let err = backend.increment_counter(&id, 1).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: MetricType::Gauge
            }
        ));
    }

    #[test]
    fn test_missing_metric() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("resources", "absent");
        assert_eq!(backend.metric_count(), 0);
        assert!(matches!(
            backend.set_gauge(&id, 1.0),
            Err(MetricsError::MetricNotFound(_))
        ));
    }
}
