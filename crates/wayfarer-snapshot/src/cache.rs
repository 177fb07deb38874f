use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use wayfarer_cdp::PageId;

use crate::model::Snapshot;

/// Short-TTL cache so a burst of reads against an unchanged page (e.g. a
/// judge call immediately following a snapshot) doesn't re-walk the DOM.
/// Invalidated eagerly by [`crate::lifecycle::LifecycleWatcher`] on
/// navigation rather than relied on to expire naturally.
#[derive(Default)]
pub struct SnapshotCache {
    entries: DashMap<PageId, (Snapshot, Instant)>,
    ttl_ms: AtomicU64,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms: AtomicU64::new(duration_to_millis(ttl)),
        }
    }

    pub fn put(&self, page: PageId, snapshot: Snapshot) {
        self.entries.insert(page, (snapshot, Instant::now()));
    }

    pub fn get(&self, page: PageId) -> Option<Snapshot> {
        let ttl = millis_to_duration(self.ttl_ms.load(Ordering::Relaxed));
        if let Some(entry) = self.entries.get(&page) {
            if entry.1.elapsed() <= ttl {
                return Some(entry.0.clone());
            }
        }
        self.entries.remove(&page);
        None
    }

    pub fn invalidate(&self, page: PageId) {
        self.entries.remove(&page);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    if millis > u128::from(u64::MAX) {
        u64::MAX
    } else {
        millis as u64
    }
}

fn millis_to_duration(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
