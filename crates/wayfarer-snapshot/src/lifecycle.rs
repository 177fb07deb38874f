//! CDP lifecycle event integration for automatic cache invalidation.
//!
//! Subscribes to the adapter's raw CDP event broadcast and invalidates the
//! snapshot cache when a page's DOM could plausibly have changed.

use std::sync::Arc;

use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wayfarer_cdp::{EventBus, PageId, RawEvent};

use crate::cache::SnapshotCache;

pub struct LifecycleWatcher {
    snapshot_cache: Arc<SnapshotCache>,
    task: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl LifecycleWatcher {
    pub fn new(snapshot_cache: Arc<SnapshotCache>) -> Self {
        Self {
            snapshot_cache,
            task: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cache invalidation policy:
    /// - `navigate`, `load`, `commit`: full page change, invalidate the page.
    /// - `domcontentloaded`, `frame_attached`, `frame_detached`: DOM structure
    ///   may have shifted, invalidate the page.
    /// - `opened`, `closed`, `focus`, network activity: no DOM change.
    pub fn start(&mut self, event_bus: EventBus) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }

        let snapshot_cache = Arc::clone(&self.snapshot_cache);
        let shutdown = self.shutdown.clone();
        let mut rx = event_bus.subscribe();

        self.task = Some(tokio::spawn(async move {
            debug!(target: "wayfarer-snapshot", "lifecycle watcher started");
            loop {
                select! {
                    _ = shutdown.cancelled() => {
                        debug!(target: "wayfarer-snapshot", "lifecycle watcher shutting down");
                        break;
                    }
                    event = rx.recv() => {
                        match event {
                            Ok(raw_event) => Self::handle_event(&raw_event, &snapshot_cache),
                            Err(err) => {
                                warn!(?err, "lifecycle watcher event channel closed");
                                break;
                            }
                        }
                    }
                }
            }
            debug!(target: "wayfarer-snapshot", "lifecycle watcher exited");
        }));
    }

    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task.take() {
            let _ = handle.await;
        }
    }

    fn handle_event(event: &RawEvent, snapshot_cache: &Arc<SnapshotCache>) {
        match event {
            RawEvent::PageLifecycle { page, phase, .. } => {
                Self::handle_phase(*page, phase, snapshot_cache);
            }
            RawEvent::PageNavigated { page, .. } => {
                Self::handle_phase(*page, "navigate", snapshot_cache);
            }
            RawEvent::NetworkActivity { .. } | RawEvent::Error { .. } => {}
        }
    }

    fn handle_phase(page: PageId, phase: &str, snapshot_cache: &Arc<SnapshotCache>) {
        match phase.to_ascii_lowercase().as_str() {
            "navigate" | "load" | "commit" | "domcontentloaded" | "frame_attached"
            | "frame_detached" | "frameattached" | "framedetached" => {
                debug!(target: "wayfarer-snapshot", ?page, phase, "invalidating snapshot cache");
                snapshot_cache.invalidate(page);
            }
            _ => {}
        }
    }
}

impl Drop for LifecycleWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CollectionTimings, ScrollPosition, Snapshot, Viewport};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::time::sleep;
    use wayfarer_cdp::event_bus;
    use wayfarer_core::BackendNodeId;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            root: BackendNodeId(1),
            nodes: BTreeMap::new(),
            viewport: Viewport::default(),
            scroll: ScrollPosition::default(),
            collected_at: chrono::Utc::now(),
            timings: CollectionTimings::default(),
        }
    }

    #[tokio::test]
    async fn lifecycle_watcher_invalidates_on_navigate() {
        let (bus, _rx) = event_bus(8);
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let page = PageId::new();
        cache.put(page, empty_snapshot());

        let mut watcher = LifecycleWatcher::new(Arc::clone(&cache));
        watcher.start(bus.clone());

        let _ = bus.send(RawEvent::PageLifecycle {
            page,
            frame: None,
            parent: None,
            opener: None,
            phase: "navigate".into(),
            ts: 0,
        });

        sleep(Duration::from_millis(50)).await;
        assert!(cache.get(page).is_none());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn lifecycle_watcher_ignores_focus_events() {
        let (bus, _rx) = event_bus(8);
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let page = PageId::new();
        cache.put(page, empty_snapshot());

        let mut watcher = LifecycleWatcher::new(Arc::clone(&cache));
        watcher.start(bus.clone());

        let _ = bus.send(RawEvent::PageLifecycle {
            page,
            frame: None,
            parent: None,
            opener: None,
            phase: "focus".into(),
            ts: 0,
        });

        sleep(Duration::from_millis(50)).await;
        assert!(cache.get(page).is_some());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn lifecycle_watcher_stops_cleanly() {
        let (bus, _rx) = event_bus(8);
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let mut watcher = LifecycleWatcher::new(cache);
        watcher.start(bus);
        watcher.stop().await;
    }
}
