//! Bridges the CDP adapter's raw event broadcast into the named events the
//! rest of the runtime observes, and drives the periodic health probe.
//!
//! Target-manager state changes caused by direct API calls (`launch`,
//! `navigate`, `switch_to`, `close_target`, ...) already emit their own
//! named events inline — this task only forwards signals the browser
//! raises on its own, outside any in-flight call: crashes today, with the
//! hook left in place for download detection once the adapter surfaces it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use wayfarer_cdp::events::RawEvent;
use wayfarer_core::Event;
use wayfarer_event_bus::EventBus;

use crate::state::TargetManagerImpl;

pub struct IngestHandle {
    event_task: JoinHandle<()>,
    health_task: JoinHandle<()>,
    health_interval_ms: Arc<AtomicU64>,
}

impl IngestHandle {
    pub fn spawn(
        manager: Arc<TargetManagerImpl>,
        mut cdp_events: broadcast::Receiver<RawEvent>,
        bus: EventBus,
        health_interval_ms: u64,
    ) -> Self {
        let interval = Arc::new(AtomicU64::new(health_interval_ms.max(1)));

        let event_bus = bus.clone();
        let event_task = tokio::spawn(async move {
            loop {
                match cdp_events.recv().await {
                    Ok(event) => handle_raw_event(&event_bus, event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "target ingest lagged behind the CDP event stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let health_manager = manager;
        let health_interval = Arc::clone(&interval);
        let health_task = tokio::spawn(async move {
            loop {
                let wait = health_interval.load(Ordering::Relaxed).max(1);
                tokio::time::sleep(Duration::from_millis(wait)).await;
                health_manager.health_probe_tick();
            }
        });

        Self {
            event_task,
            health_task,
            health_interval_ms: interval,
        }
    }

    pub fn set_health_interval_ms(&self, ms: u64) {
        self.health_interval_ms.store(ms.max(1), Ordering::Relaxed);
    }

    pub fn stop(self) {
        self.event_task.abort();
        self.health_task.abort();
    }
}

async fn handle_raw_event(bus: &EventBus, event: RawEvent) {
    if let RawEvent::Error { page, message } = event {
        if message.to_ascii_lowercase().contains("crash") {
            bus.emit(Event::new(
                "browser_crash",
                json!({ "cdp_page": page.map(|p| format!("{:?}", p.0)), "message": message }),
            ))
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_cdp::{event_bus, CdpAdapter, CdpConfig};

    #[tokio::test]
    async fn crash_message_is_forwarded_as_browser_crash() {
        let (cdp_bus, cdp_rx) = event_bus(8);
        let adapter = Arc::new(CdpAdapter::new(CdpConfig::default(), cdp_bus.clone()));
        Arc::clone(&adapter).start().await.expect("adapter start");
        let manager = Arc::new(TargetManagerImpl::new(adapter, EventBus::new()));

        let bus = EventBus::new();
        let mut sub = bus.subscribe("browser_crash").await;
        let _handle = IngestHandle::spawn(manager, cdp_rx, bus, 60_000);

        cdp_bus
            .send(RawEvent::Error {
                page: None,
                message: "target crashed unexpectedly".to_string(),
            })
            .ok();

        let event = tokio::time::timeout(Duration::from_secs(1), sub.receiver.recv())
            .await
            .expect("crash event delivered")
            .expect("channel open");
        assert_eq!(event.event_type, "browser_crash");
    }
}
