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


//! Metric handles recorded by the resource manager.

use reliquary_core::telemetry::{MetricsError, MetricsResult};
use reliquary_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry, ScopedMetricTimer,
};

/// A collection of metric handles covering cache and loader activity.
#[derive(Debug, Clone)]
pub struct ResourceMetrics {
    /// Requests answered from the cache.
    pub cache_hits: CounterHandle,
    /// Cacheable requests that had to load.
    pub cache_misses: CounterHandle,
    /// Successful loader runs.
    pub loads_total: CounterHandle,
    /// Loader runs that failed.
    pub load_failures: CounterHandle,
    /// Entries removed from the cache.
    pub evictions: CounterHandle,
    /// Identities currently registered.
    pub live_identities: GaugeHandle,
    /// Loader run time in milliseconds.
    pub load_time_ms: HistogramHandle,
}

impl ResourceMetrics {
    /// Registers every resource metric under `namespace`.
    pub fn register(registry: &MetricsRegistry, namespace: &str) -> MetricsResult<Self> {
        Ok(Self {
            cache_hits: registry.register_counter(
                namespace,
                "cache_hits",
                "Resource requests answered from the cache",
            )?,
            cache_misses: registry.register_counter(
                namespace,
                "cache_misses",
                "Cacheable resource requests that required a load",
            )?,
            loads_total: registry.register_counter(
                namespace,
                "loads_total",
                "Total number of successful loader runs",
            )?,
            load_failures: registry.register_counter(
                namespace,
                "load_failures",
                "Total number of failed loader runs",
            )?,
            evictions: registry.register_counter(
                namespace,
                "evictions",
                "Resources removed from the cache",
            )?,
            live_identities: registry.register_gauge(
                namespace,
                "live_identities",
                "Identities currently registered",
                "count",
            )?,
            load_time_ms: registry.register_histogram(
                namespace,
                "load_time",
                "Resource decoding time",
                "ms",
                vec![1.0, 5.0, 16.0, 33.0, 100.0, 500.0],
            )?,
        })
    }

    /// Starts timing a loader run.
    pub(crate) fn load_timer(&self) -> ScopedMetricTimer<'_> {
        ScopedMetricTimer::new(&self.load_time_ms)
    }

    pub(crate) fn hit(&self) {
        record("cache_hits", self.cache_hits.increment());
    }

    pub(crate) fn miss(&self) {
        record("cache_misses", self.cache_misses.increment());
    }

    pub(crate) fn loaded(&self) {
        record("loads_total", self.loads_total.increment());
    }

    pub(crate) fn failed(&self) {
        record("load_failures", self.load_failures.increment());
    }

    pub(crate) fn evicted(&self, count: usize) {
        if count > 0 {
            record("evictions", self.evictions.increment_by(count as u64));
        }
    }

    pub(crate) fn live(&self, count: usize) {
        record("live_identities", self.live_identities.set(count as f64));
    }
}

fn record<T>(metric: &str, result: Result<T, MetricsError>) {
    if let Err(e) = result {
        log::warn!("Failed to record resource metric '{metric}': {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_every_metric_in_the_namespace() {
        let registry = MetricsRegistry::new();
        ResourceMetrics::register(&registry, "assets").unwrap();

        assert_eq!(registry.namespace_metrics("assets").len(), 7);
        assert!(registry.namespace_metrics("resources").is_empty());
    }

    #[test]
    fn test_recording_helpers() {
        let registry = MetricsRegistry::new();
        let metrics = ResourceMetrics::register(&registry, "resources").unwrap();

        metrics.hit();
        metrics.hit();
        metrics.evicted(0);
        metrics.evicted(3);
        metrics.live(4);
        {
            let _timer = metrics.load_timer();
        }

        assert_eq!(metrics.cache_hits.get().unwrap(), 2);
        assert_eq!(metrics.evictions.get().unwrap(), 3);
        assert_eq!(metrics.live_identities.get().unwrap(), 4.0);
        let samples = metrics.load_time_ms.get_metric().unwrap().value.sample_count();
        assert_eq!(samples, Some(1));
    }
}
