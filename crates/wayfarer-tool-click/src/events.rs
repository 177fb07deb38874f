use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wayfarer_core::{ActionId, BackendNodeId, Event, WayfarerError};
use wayfarer_event_bus::EventBus;

use crate::model::PostSignals;
use crate::ports::{EventsPort, PrecheckEvent};

/// Publishes click lifecycle events onto the shared bus under the
/// `action.click.*` namespace.
#[derive(Clone)]
pub struct ClickEvents {
    bus: Arc<EventBus>,
}

impl ClickEvents {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EventsPort for ClickEvents {
    async fn emit_started(&self, action: &ActionId, node: BackendNodeId) {
        self.bus
            .emit(Event::new(
                "action.click.started",
                json!({ "action_id": action.0, "node": node.0 }),
            ))
            .await;
    }

    async fn emit_precheck(&self, action: &ActionId, precheck: &PrecheckEvent) {
        self.bus
            .emit(Event::new(
                "action.click.precheck",
                json!({
                    "action_id": action.0,
                    "visible": precheck.visible,
                    "clickable": precheck.clickable,
                    "enabled": precheck.enabled,
                }),
            ))
            .await;
    }

    async fn emit_finished(&self, action: &ActionId, report: &PostSignals, ok: bool, error: Option<&WayfarerError>) {
        self.bus
            .emit(Event::new(
                "action.click.finished",
                json!({
                    "action_id": action.0,
                    "ok": ok,
                    "url": report.url,
                    "title": report.title,
                    "error": error.map(|e| e.message().to_string()),
                }),
            ))
            .await;
    }
}
