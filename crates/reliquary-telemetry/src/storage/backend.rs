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


use reliquary_core::telemetry::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
use std::fmt::Debug;

/// Storage for metrics.
///
/// Implementations only need to provide atomic [`MetricsBackend::update`];
/// the typed operations are built on top of it so a counter increment is never
/// split into a separate read and write.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Stores a metric, replacing any metric with the same ID.
    fn put_metric(&self, metric: Metric) -> MetricsResult<()>;

    /// Returns a snapshot of a metric.
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Applies `apply` to the stored metric while holding exclusive access to it.
    fn update(
        &self,
        id: &MetricId,
        apply: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()>;

    /// Snapshots every stored metric.
    fn list_all_metrics(&self) -> Vec<Metric>;

    /// Number of stored metrics.
    fn metric_count(&self) -> usize;

    /// Adds `delta` to a counter and returns the new value.
    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64> {
        let mut result = 0;
        self.update(id, &mut |metric| match metric.value {
            MetricValue::Counter(ref mut value) => {
                *value = value.saturating_add(delta);
                result = *value;
                Ok(())
            }
            ref other => Err(mismatch(MetricType::Counter, other)),
        })?;
        Ok(result)
    }

    /// Overwrites a gauge.
    fn set_gauge(&self, id: &MetricId, value: f64) -> MetricsResult<()> {
        self.update(id, &mut |metric| match metric.value {
            MetricValue::Gauge(ref mut current) => {
                *current = value;
                Ok(())
            }
            ref other => Err(mismatch(MetricType::Gauge, other)),
        })
    }

    /// Records one histogram sample.
    fn record_histogram_sample(&self, id: &MetricId, sample: f64) -> MetricsResult<()> {
        self.update(id, &mut |metric| match metric.value {
            MetricValue::Histogram {
                ref mut samples,
                ref bucket_bounds,
                ref mut bucket_counts,
            } => {
                samples.push(sample);
                for (count, bound) in bucket_counts.iter_mut().zip(bucket_bounds) {
                    if sample <= *bound {
                        *count += 1;
                    }
                }
                Ok(())
            }
            ref other => Err(mismatch(MetricType::Histogram, other)),
        })
    }
}

fn mismatch(expected: MetricType, found: &MetricValue) -> MetricsError {
    MetricsError::TypeMismatch {
        expected,
        found: found.metric_type(),
    }
}
