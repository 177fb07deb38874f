//! Telemetry helpers for the snapshot collector.
//!
//! Lightweight counters + latency aggregates so the CLI can surface basic
//! metrics without depending on an external metrics backend at this layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

static COLLECT_TOTAL: AtomicU64 = AtomicU64::new(0);
static COLLECT_CACHE_HIT: AtomicU64 = AtomicU64::new(0);
static COLLECT_CACHE_MISS: AtomicU64 = AtomicU64::new(0);
static COLLECT_LAT_NS: AtomicU64 = AtomicU64::new(0);
static COLLECT_LAT_SAMPLES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricCounter {
    pub total: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheMetric {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSnapshot {
    pub collect: MetricCounter,
    pub collect_cache: CacheMetric,
}

pub fn record_collect(cache_hit: bool, duration: Duration) {
    COLLECT_TOTAL.fetch_add(1, Ordering::Relaxed);
    if cache_hit {
        COLLECT_CACHE_HIT.fetch_add(1, Ordering::Relaxed);
    } else {
        COLLECT_CACHE_MISS.fetch_add(1, Ordering::Relaxed);
    }
    record_latency(&COLLECT_LAT_NS, &COLLECT_LAT_SAMPLES, duration);
}

pub fn snapshot() -> MetricSnapshot {
    MetricSnapshot {
        collect: make_counter(
            COLLECT_TOTAL.load(Ordering::Relaxed),
            COLLECT_LAT_NS.load(Ordering::Relaxed),
            COLLECT_LAT_SAMPLES.load(Ordering::Relaxed),
        ),
        collect_cache: make_cache_metric(
            COLLECT_CACHE_HIT.load(Ordering::Relaxed),
            COLLECT_CACHE_MISS.load(Ordering::Relaxed),
        ),
    }
}

fn make_counter(total: u64, nanos: u64, samples: u64) -> MetricCounter {
    let avg_ms = if samples == 0 {
        0.0
    } else {
        (nanos as f64 / samples as f64) / 1_000_000.0
    };
    MetricCounter { total, avg_ms }
}

fn make_cache_metric(hits: u64, misses: u64) -> CacheMetric {
    let total = hits + misses;
    let hit_rate = if total == 0 {
        0.0
    } else {
        hits as f64 * 100.0 / total as f64
    };
    CacheMetric {
        hits,
        misses,
        hit_rate,
    }
}

fn record_latency(total_ns: &AtomicU64, samples: &AtomicU64, duration: Duration) {
    let nanos = duration_to_nanos(duration);
    total_ns.fetch_add(nanos, Ordering::Relaxed);
    samples.fetch_add(1, Ordering::Relaxed);
}

fn duration_to_nanos(duration: Duration) -> u64 {
    let nanos = duration.as_nanos();
    if nanos > u64::MAX as u128 {
        u64::MAX
    } else {
        nanos as u64
    }
}
