//! The event bus: every component in the runtime that wants to observe what
//! another component did subscribes here instead of holding a direct
//! reference to it (spec §4.G).
//!
//! Emission is cooperative and single-threaded: [`EventBus::emit`] takes the
//! bus's own lock for its whole duration, so two concurrent emitters never
//! interleave delivery to the same listener, and a listener can assume events
//! it sees arrive in the order they were emitted.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use wayfarer_core::Event;

use crate::errors::EventBusError;

const DEFAULT_HISTORY_CAPACITY: usize = 100;

struct Listener {
    id: String,
    pattern: String,
    once: bool,
    sender: mpsc::UnboundedSender<Event>,
}

impl Listener {
    /// Wildcard patterns sort before specific ones: broad observers (loggers,
    /// watchdogs) see an event before the narrow listener that acts on it.
    fn specificity(&self) -> u8 {
        if self.pattern == "*" {
            0
        } else if self.pattern.ends_with(".*") {
            1
        } else {
            2
        }
    }
}

struct Inner {
    history: VecDeque<Event>,
    history_capacity: usize,
    listeners: Vec<Listener>,
}

/// A subscription handle. Dropping it does not unsubscribe — call
/// [`EventBus::unsubscribe`] explicitly, matching the bus's conscious
/// lifecycle rather than relying on drop order.
pub struct Subscription {
    pub id: String,
    pub receiver: mpsc::UnboundedReceiver<Event>,
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                history: VecDeque::with_capacity(capacity.max(1)),
                history_capacity: capacity.max(1),
                listeners: Vec::new(),
            })),
        }
    }

    /// Publishes `event`, recording it in the bounded history and delivering
    /// it to every listener whose pattern matches, wildcard patterns first.
    pub async fn emit(&self, event: Event) {
        let mut inner = self.inner.lock().await;

        if inner.history.len() >= inner.history_capacity {
            inner.history.pop_front();
        }
        inner.history.push_back(event.clone());

        let mut matching: Vec<usize> = inner
            .listeners
            .iter()
            .enumerate()
            .filter(|(_, l)| event.matches(&l.pattern))
            .map(|(idx, _)| idx)
            .collect();
        matching.sort_by_key(|&idx| inner.listeners[idx].specificity());

        let mut fired_once: Vec<String> = Vec::new();
        let mut dead: Vec<String> = Vec::new();
        for idx in matching {
            let listener = &inner.listeners[idx];
            if listener.sender.send(event.clone()).is_err() {
                dead.push(listener.id.clone());
                continue;
            }
            if listener.once {
                fired_once.push(listener.id.clone());
            }
        }

        inner
            .listeners
            .retain(|l| !fired_once.contains(&l.id) && !dead.contains(&l.id));
    }

    pub async fn subscribe(&self, pattern: impl Into<String>) -> Subscription {
        self.register(pattern.into(), false).await
    }

    /// Like `subscribe`, but the listener is removed after its first
    /// matching delivery.
    pub async fn once(&self, pattern: impl Into<String>) -> Subscription {
        self.register(pattern.into(), true).await
    }

    async fn register(&self, pattern: String, once: bool) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().await;
        inner.listeners.push(Listener {
            id: id.clone(),
            pattern,
            once,
            sender,
        });
        Subscription { id, receiver }
    }

    pub async fn unsubscribe(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        inner.listeners.retain(|l| l.id != id);
    }

    /// Awaits the next event matching `pattern`, or times out.
    pub async fn wait_for(&self, pattern: impl Into<String>, timeout: Duration) -> Result<Event, EventBusError> {
        let pattern = pattern.into();
        let mut sub = self.once(pattern.clone()).await;
        match tokio::time::timeout(timeout, sub.receiver.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(EventBusError::Closed),
            Err(_) => {
                self.unsubscribe(&sub.id).await;
                Err(EventBusError::Timeout(pattern))
            }
        }
    }

    /// Returns up to `limit` most recent events, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<Event> {
        let inner = self.inner.lock().await;
        let skip = inner.history.len().saturating_sub(limit);
        inner.history.iter().skip(skip).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_is_bounded_fifo() {
        let bus = EventBus::with_history_capacity(2);
        for i in 0..5 {
            bus.emit(Event::new("tick", serde_json::json!({ "i": i }))).await;
        }
        let history = bus.history(10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].payload["i"], 3);
        assert_eq!(history[1].payload["i"], 4);
    }

    #[tokio::test]
    async fn wildcard_listener_fires_before_specific_listener() {
        let bus = EventBus::new();
        let mut wildcard = bus.subscribe("dom.*").await;
        let mut specific = bus.subscribe("dom.mutation").await;
        bus.emit(Event::new("dom.mutation", serde_json::json!({}))).await;

        let from_wildcard = wildcard.receiver.recv().await;
        let from_specific = specific.receiver.recv().await;
        assert!(from_wildcard.is_some());
        assert!(from_specific.is_some());
    }

    #[tokio::test]
    async fn once_listener_is_removed_after_first_match() {
        let bus = EventBus::new();
        let mut sub = bus.once("page.crashed").await;
        bus.emit(Event::new("page.crashed", serde_json::json!({}))).await;
        bus.emit(Event::new("page.crashed", serde_json::json!({}))).await;

        assert!(sub.receiver.recv().await.is_some());
        // second emission had no listener left, channel closes without a
        // second message queued.
        assert!(sub.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn wait_for_times_out_when_nothing_matches() {
        let bus = EventBus::new();
        let result = bus.wait_for("never.happens", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(EventBusError::Timeout(_))));
    }

    #[tokio::test]
    async fn wait_for_resolves_on_match() {
        let bus = EventBus::new();
        let bus2 = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            bus2.emit(Event::new("task.done", serde_json::json!({}))).await;
        });
        let event = bus.wait_for("task.done", Duration::from_secs(1)).await.unwrap();
        assert_eq!(event.event_type, "task.done");
    }
}
