//! Statistics for mutation lifecycles

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MAX_SAMPLES: usize = 1000;

/// Point-in-time counters for the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
    pub rolled_back: u64,
    pub settle_p50_ms: f64,
    pub settle_p99_ms: f64,
}

/// Thread-safe statistics collector
#[derive(Clone)]
pub struct StatsCollector {
    started: Arc<AtomicU64>,
    succeeded: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
    rolled_back: Arc<AtomicU64>,
    latencies: Arc<Mutex<Vec<f64>>>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            started: Arc::new(AtomicU64::new(0)),
            succeeded: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
            rolled_back: Arc::new(AtomicU64::new(0)),
            latencies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record_start(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time from start to `Settled` (in milliseconds)
    pub fn record_settle_latency(&self, latency_ms: f64) {
        let mut latencies = self.latencies.lock();
        latencies.push(latency_ms);
        // Keep the buffer bounded
        if latencies.len() > MAX_SAMPLES {
            latencies.drain(0..MAX_SAMPLES / 2);
        }
    }

    pub fn snapshot(&self) -> SyncStats {
        let (p50, p99) = {
            let mut latencies = self.latencies.lock();
            if latencies.is_empty() {
                (0.0, 0.0)
            } else {
                latencies.sort_by(|a, b| a.total_cmp(b));
                let last = latencies.len() - 1;
                let p50_idx = (latencies.len() as f64 * 0.50) as usize;
                let p99_idx = (latencies.len() as f64 * 0.99) as usize;
                (latencies[p50_idx.min(last)], latencies[p99_idx.min(last)])
            }
        };

        SyncStats {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            settle_p50_ms: p50,
            settle_p99_ms: p99,
        }
    }

    pub fn reset(&self) {
        self.started.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.rolled_back.store(0, Ordering::Relaxed);
        self.latencies.lock().clear();
    }
}
