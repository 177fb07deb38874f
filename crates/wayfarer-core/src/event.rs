//! The event envelope emitted onto the event bus (spec §3, §4.G).

use crate::ids::SessionId;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub parent_id: Option<String>,
    pub session: Option<SessionId>,
    #[cfg_attr(feature = "serde-full", serde(with = "chrono::serde::ts_milliseconds"))]
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            parent_id: None,
            session: None,
            created_at: chrono::Utc::now(),
            payload,
        }
    }

    pub fn child_of(mut self, parent: &Event) -> Self {
        self.parent_id = Some(parent.id.clone());
        self
    }

    pub fn for_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Matches a listener pattern of the form `"namespace.*"` or an exact
    /// event type, per the wildcard-then-specific ordering in spec §4.G.
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            return self
                .event_type
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with('.'))
                .unwrap_or(false);
        }
        self.event_type == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_pattern_matches_namespace_prefix() {
        let event = Event::new("dom.mutation", serde_json::json!({}));
        assert!(event.matches("dom.*"));
        assert!(!event.matches("network.*"));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        let event = Event::new("page.crashed", serde_json::json!({}));
        assert!(event.matches("page.crashed"));
        assert!(!event.matches("page.crashed.retry"));
    }

    #[test]
    fn child_event_carries_parent_id() {
        let parent = Event::new("task.started", serde_json::json!({}));
        let child = Event::new("action.dispatched", serde_json::json!({})).child_of(&parent);
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
    }
}
