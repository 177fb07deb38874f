//! Passive observers that inspect every event flowing through the bus and
//! raise their own `watchdog.*` events when they recognize a hazard: a
//! crashed page, a permission prompt, a stalled download, or DOM mutations
//! arriving faster than downstream consumers can use them.
//!
//! Each watchdog is stateless pattern matching over one event at a time; the
//! [`WatchdogRegistry`] is what turns that into a background task wired to
//! the bus.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;
use uuid::Uuid;

use wayfarer_core::Event;

use crate::bus::EventBus;

const PERMISSION_HINTS: &[&str] = &[
    "need your permission",
    "permission denied",
    "allow notifications",
    "allow location",
];
const DOWNLOAD_HINTS: &[&str] = &["downloading", "download complete", "save file", "save as"];
const CRASH_HINTS: &[&str] = &["page crashed", "target closed", "crash", "renderer"];

#[derive(Clone, Debug)]
pub struct WatchdogFinding {
    pub id: String,
    pub kind: String,
    pub severity: &'static str,
    pub note: String,
}

impl WatchdogFinding {
    fn new(kind: &str, severity: &'static str, note: impl Into<String>) -> Self {
        Self {
            id: format!("watchdog-{kind}-{}", Uuid::new_v4()),
            kind: kind.to_string(),
            severity,
            note: note.into(),
        }
    }
}

pub trait Watchdog: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns a finding if `event` trips this watchdog's condition.
    fn inspect(&self, event: &Event) -> Option<WatchdogFinding>;
}

fn text_blob(payload: &Value) -> String {
    let mut parts = Vec::new();
    for key in ["text_sample", "note", "message", "error"] {
        if let Some(text) = payload.get(key).and_then(Value::as_str) {
            parts.push(text.to_ascii_lowercase());
        }
    }
    parts.join(" ")
}

/// Flags a `page.*`/`target.*` event whose payload describes a dead renderer.
pub struct CrashRecoveryWatchdog;

impl Watchdog for CrashRecoveryWatchdog {
    fn name(&self) -> &'static str {
        "crash_recovery"
    }

    fn inspect(&self, event: &Event) -> Option<WatchdogFinding> {
        let blob = text_blob(&event.payload);
        if !CRASH_HINTS.iter().any(|hint| blob.contains(hint)) {
            return None;
        }
        Some(WatchdogFinding::new(
            "page_crash",
            "critical",
            "browser session ended unexpectedly: page crash or target closed",
        ))
    }
}

/// Flags a permission-prompt dialog surfaced in a DOM or console observation.
pub struct PermissionPromptWatchdog;

impl Watchdog for PermissionPromptWatchdog {
    fn name(&self) -> &'static str {
        "permission_prompt"
    }

    fn inspect(&self, event: &Event) -> Option<WatchdogFinding> {
        let blob = text_blob(&event.payload);
        if blob.is_empty() || !PERMISSION_HINTS.iter().any(|hint| blob.contains(hint)) {
            return None;
        }
        Some(WatchdogFinding::new(
            "permission_request",
            "warn",
            "browser permission prompt detected, automation may be blocked until resolved",
        ))
    }
}

/// Flags a download prompt or in-progress download notice.
pub struct DownloadWatchdog;

impl Watchdog for DownloadWatchdog {
    fn name(&self) -> &'static str {
        "download"
    }

    fn inspect(&self, event: &Event) -> Option<WatchdogFinding> {
        let blob = text_blob(&event.payload);
        if blob.is_empty() || !DOWNLOAD_HINTS.iter().any(|hint| blob.contains(hint)) {
            return None;
        }
        Some(WatchdogFinding::new(
            "download_prompt",
            "info",
            "download activity detected, a file picker or save dialog may be blocking the page",
        ))
    }
}

/// Suppresses repeated `dom.mutation` events within a minimum interval so a
/// chatty page doesn't flood listeners faster than they can act.
pub struct DomThrottleWatchdog {
    min_interval: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl DomThrottleWatchdog {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fired: Mutex::new(None),
        }
    }
}

impl Watchdog for DomThrottleWatchdog {
    fn name(&self) -> &'static str {
        "dom_throttle"
    }

    fn inspect(&self, event: &Event) -> Option<WatchdogFinding> {
        if event.event_type != "dom.mutation" {
            return None;
        }
        let now = Instant::now();
        let mut last_fired = self.last_fired.lock().expect("dom throttle mutex poisoned");
        let should_fire = match *last_fired {
            Some(previous) => now.duration_since(previous) >= self.min_interval,
            None => true,
        };
        if !should_fire {
            return None;
        }
        *last_fired = Some(now);
        Some(WatchdogFinding::new(
            "dom_mutation_burst",
            "info",
            "DOM mutations are arriving faster than the throttle interval",
        ))
    }
}

/// Wires a fixed set of watchdogs to a bus: every event is inspected, and any
/// finding is re-emitted as its own `watchdog.<kind>` event, nested under the
/// event that triggered it.
pub struct WatchdogRegistry {
    watchdogs: Vec<Box<dyn Watchdog>>,
}

impl WatchdogRegistry {
    pub fn new(watchdogs: Vec<Box<dyn Watchdog>>) -> Self {
        Self { watchdogs }
    }

    pub fn default_set() -> Self {
        Self::new(vec![
            Box::new(CrashRecoveryWatchdog),
            Box::new(PermissionPromptWatchdog),
            Box::new(DownloadWatchdog),
            Box::new(DomThrottleWatchdog::new(Duration::from_millis(250))),
        ])
    }

    /// Spawns a background task that inspects every event on `bus` and
    /// publishes any findings back onto it. The returned handle can be
    /// aborted to stop watching.
    pub fn spawn(self, bus: EventBus) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut subscription = bus.subscribe("*").await;
            while let Some(event) = subscription.receiver.recv().await {
                for watchdog in &self.watchdogs {
                    if let Some(finding) = watchdog.inspect(&event) {
                        let finding_event = Event::new(
                            format!("watchdog.{}", finding.kind),
                            serde_json::json!({
                                "id": finding.id,
                                "watchdog": watchdog.name(),
                                "severity": finding.severity,
                                "note": finding.note,
                            }),
                        )
                        .child_of(&event);
                        bus.emit(finding_event).await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_watchdog_matches_target_closed() {
        let watchdog = CrashRecoveryWatchdog;
        let event = Event::new("page.error", serde_json::json!({ "error": "Target closed: page crashed" }));
        let finding = watchdog.inspect(&event).expect("finding");
        assert_eq!(finding.kind, "page_crash");
        assert_eq!(finding.severity, "critical");
    }

    #[test]
    fn permission_watchdog_ignores_unrelated_text() {
        let watchdog = PermissionPromptWatchdog;
        let event = Event::new("dom.mutation", serde_json::json!({ "text_sample": "hello world" }));
        assert!(watchdog.inspect(&event).is_none());
    }

    #[test]
    fn download_watchdog_matches_hint() {
        let watchdog = DownloadWatchdog;
        let event = Event::new("dom.mutation", serde_json::json!({ "note": "Downloading file" }));
        let finding = watchdog.inspect(&event).expect("finding");
        assert_eq!(finding.kind, "download_prompt");
    }

    #[test]
    fn dom_throttle_suppresses_rapid_repeats() {
        let watchdog = DomThrottleWatchdog::new(Duration::from_millis(50));
        let event = Event::new("dom.mutation", serde_json::json!({}));
        assert!(watchdog.inspect(&event).is_some());
        assert!(watchdog.inspect(&event).is_none());
    }

    #[tokio::test]
    async fn registry_emits_finding_event_for_matching_observation() {
        let bus = EventBus::new();
        let mut findings = bus.subscribe("watchdog.*").await;
        let _handle = WatchdogRegistry::default_set().spawn(bus.clone());

        bus.emit(Event::new(
            "page.error",
            serde_json::json!({ "error": "target closed" }),
        ))
        .await;

        let found = findings.receiver.recv().await.expect("a watchdog finding");
        assert_eq!(found.event_type, "watchdog.page_crash");
    }
}
