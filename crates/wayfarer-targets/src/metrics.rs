//! Lightweight in-process counters for the target manager. No external
//! metrics backend is wired up at this layer; the bin crate's own
//! telemetry setup is responsible for exporting whatever it needs from
//! `snapshot()`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetMetricsSnapshot {
    pub sessions: i64,
    pub targets: i64,
    pub frames: i64,
    pub health_probes: u64,
}

static SESSIONS: AtomicI64 = AtomicI64::new(0);
static TARGETS: AtomicI64 = AtomicI64::new(0);
static FRAMES: AtomicI64 = AtomicI64::new(0);
static HEALTH_PROBES: AtomicU64 = AtomicU64::new(0);

pub fn set_session_count(count: usize) {
    SESSIONS.store(count as i64, Ordering::Relaxed);
}

pub fn set_target_count(count: usize) {
    TARGETS.store(count as i64, Ordering::Relaxed);
}

pub fn set_frame_count(count: usize) {
    FRAMES.store(count as i64, Ordering::Relaxed);
}

pub fn record_health_probe() {
    HEALTH_PROBES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> TargetMetricsSnapshot {
    TargetMetricsSnapshot {
        sessions: SESSIONS.load(Ordering::Relaxed),
        targets: TARGETS.load(Ordering::Relaxed),
        frames: FRAMES.load(Ordering::Relaxed),
        health_probes: HEALTH_PROBES.load(Ordering::Relaxed),
    }
}
