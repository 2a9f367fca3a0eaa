//! Cache metrics for observability

use crate::keys::CacheKey;
use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    invalidations: CounterVec,
    evictions: CounterVec,
    cancelled_reads: CounterVec,
    discarded_fetches: CounterVec,
}

fn counter(name: &str, help: &str) -> CounterVec {
    CounterVec::new(Opts::new(name, help), &["family"]).expect("valid metric definition")
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: counter("query_cache_hits_total", "Total fresh cache reads"),
            misses: counter(
                "query_cache_misses_total",
                "Total reads that required an authoritative fetch",
            ),
            writes: counter("query_cache_writes_total", "Total cache writes"),
            invalidations: counter(
                "query_cache_invalidations_total",
                "Total entries marked stale",
            ),
            evictions: counter("query_cache_evictions_total", "Total entries evicted"),
            cancelled_reads: counter(
                "query_cache_cancelled_reads_total",
                "Total read epochs bumped by cancellation",
            ),
            discarded_fetches: counter(
                "query_cache_discarded_fetches_total",
                "Total fetch results discarded because the read was superseded",
            ),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.evictions.clone()))?;
        registry.register(Box::new(self.cancelled_reads.clone()))?;
        registry.register(Box::new(self.discarded_fetches.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

fn family(key: &CacheKey) -> &str {
    key.family().unwrap_or("unknown")
}

/// Cache metrics wrapper
#[derive(Clone, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, key: &CacheKey) {
        get_metrics().hits.with_label_values(&[family(key)]).inc();
    }

    pub fn record_miss(&self, key: &CacheKey) {
        get_metrics().misses.with_label_values(&[family(key)]).inc();
    }

    pub fn record_write(&self, key: &CacheKey) {
        get_metrics().writes.with_label_values(&[family(key)]).inc();
    }

    pub fn record_invalidation(&self, key: &CacheKey) {
        get_metrics()
            .invalidations
            .with_label_values(&[family(key)])
            .inc();
    }

    pub fn record_eviction(&self, key: &CacheKey) {
        get_metrics()
            .evictions
            .with_label_values(&[family(key)])
            .inc();
    }

    pub fn record_cancelled_read(&self, key: &CacheKey) {
        get_metrics()
            .cancelled_reads
            .with_label_values(&[family(key)])
            .inc();
    }

    pub fn record_discarded_fetch(&self, key: &CacheKey) {
        get_metrics()
            .discarded_fetches
            .with_label_values(&[family(key)])
            .inc();
    }
}
