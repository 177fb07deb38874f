//! Lightweight counters for screenshot capture, in the same style as
//! `wayfarer-snapshot`'s own metrics module.

use std::sync::atomic::{AtomicU64, Ordering};

static CAPTURE_TOTAL: AtomicU64 = AtomicU64::new(0);
static CAPTURE_CACHE_HIT: AtomicU64 = AtomicU64::new(0);
static CAPTURE_CACHE_MISS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Default)]
pub struct VisualMetrics {
    pub total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub fn record_capture(cache_hit: bool) {
    CAPTURE_TOTAL.fetch_add(1, Ordering::Relaxed);
    if cache_hit {
        CAPTURE_CACHE_HIT.fetch_add(1, Ordering::Relaxed);
    } else {
        CAPTURE_CACHE_MISS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn snapshot() -> VisualMetrics {
    VisualMetrics {
        total: CAPTURE_TOTAL.load(Ordering::Relaxed),
        cache_hits: CAPTURE_CACHE_HIT.load(Ordering::Relaxed),
        cache_misses: CAPTURE_CACHE_MISS.load(Ordering::Relaxed),
    }
}
