use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wayfarer_core::{ActionId, BackendNodeId, Event, WayfarerError};
use wayfarer_event_bus::EventBus;

use crate::ports::{EventsPort, PostEventPayload, PrecheckEvent};

/// Publishes select lifecycle events onto the shared bus under the
/// `action.select.*` namespace.
#[derive(Clone)]
pub struct SelectEvents {
    bus: Arc<EventBus>,
}

impl SelectEvents {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EventsPort for SelectEvents {
    async fn emit_started(&self, action: &ActionId, node: BackendNodeId) {
        self.bus
            .emit(Event::new("action.select.started", json!({ "action_id": action.0, "node": node.0 })))
            .await;
    }

    async fn emit_precheck(&self, action: &ActionId, precheck: &PrecheckEvent) {
        self.bus
            .emit(Event::new(
                "action.select.precheck",
                json!({
                    "action_id": action.0,
                    "visible": precheck.visible,
                    "clickable": precheck.clickable,
                    "enabled": precheck.enabled,
                    "readonly": precheck.readonly,
                }),
            ))
            .await;
    }

    async fn emit_finished(&self, action: &ActionId, signals: &PostEventPayload, ok: bool, error: Option<&WayfarerError>) {
        self.bus
            .emit(Event::new(
                "action.select.finished",
                json!({
                    "action_id": action.0,
                    "ok": ok,
                    "selection_changed": signals.selection.changed,
                    "selected_count": signals.selection.selected_count,
                    "error": error.map(|e| e.message().to_string()),
                }),
            ))
            .await;
    }
}
