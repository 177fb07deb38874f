//! Given a natural-language description, asks the model against the current
//! serialised listing for a single index plus a short rationale.

use serde::Deserialize;
use std::sync::Arc;

use wayfarer_composer::{Message, Role};
use wayfarer_core::{BackendNodeId, WayfarerError};
use wayfarer_serializer::SelectorMap;

use crate::errors::AgentLoopError;
use crate::model::ModelCapability;
use crate::reply::{salvage_json_object, strip_fence};

pub struct LocatorResolver {
    model: Arc<dyn ModelCapability>,
}

#[derive(Debug, Clone)]
pub struct LocatorResult {
    pub thinking: String,
    /// `None` when the model's index is absent from the selector map —
    /// callers convert this to a `mustGet…` failure.
    pub backend_node_id: Option<BackendNodeId>,
}

#[derive(Deserialize)]
struct RawLocatorReply {
    #[serde(default)]
    thinking: String,
    element_index: Option<u32>,
}

impl LocatorResolver {
    pub fn new(model: Arc<dyn ModelCapability>) -> Self {
        Self { model }
    }

    pub async fn resolve(
        &self,
        description: &str,
        listing: &str,
        selector_map: &SelectorMap,
    ) -> Result<LocatorResult, WayfarerError> {
        let prompt = format!(
            "Find the element matching this description: \"{description}\"\n\n\
             Interactive elements:\n{listing}\n\n\
             Respond with JSON: {{\"thinking\": \"...\", \"element_index\": <integer>}}. \
             If no element matches, omit `element_index`."
        );
        let messages = [
            Message::new(Role::System, "You locate a single element by index given a description and a listing."),
            Message::new(Role::User, prompt),
        ];

        let text = self.model.chat(&messages).await?;
        let raw = parse_locator_reply(&text).map_err(AgentLoopError::ReplyParse)?;

        let backend_node_id = raw.element_index.and_then(|index| selector_map.get(&index).copied());

        Ok(LocatorResult { thinking: raw.thinking, backend_node_id })
    }
}

fn parse_locator_reply(text: &str) -> Result<RawLocatorReply, String> {
    let candidate = strip_fence(text).unwrap_or(text);
    serde_json::from_str(candidate).or_else(|first_err| {
        salvage_json_object(text)
            .ok_or_else(|| first_err.to_string())
            .and_then(|salvaged| serde_json::from_str(salvaged).map_err(|e| e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptedModel;
    use std::collections::HashMap;

    #[tokio::test]
    async fn resolves_to_the_backend_node_for_a_known_index() {
        let model: Arc<dyn ModelCapability> = Arc::new(ScriptedModel::new([
            r#"{"thinking":"that's the submit button","element_index":3}"#.to_string(),
        ]));
        let resolver = LocatorResolver::new(model);
        let mut map: SelectorMap = HashMap::new();
        map.insert(3, BackendNodeId(42));

        let result = resolver.resolve("the submit button", "[3]<button>Submit</button>", &map).await.unwrap();
        assert_eq!(result.backend_node_id, Some(BackendNodeId(42)));
    }

    #[tokio::test]
    async fn an_index_missing_from_the_selector_map_resolves_to_none() {
        let model: Arc<dyn ModelCapability> =
            Arc::new(ScriptedModel::new([r#"{"thinking":"guessing","element_index":99}"#.to_string()]));
        let resolver = LocatorResolver::new(model);
        let map: SelectorMap = HashMap::new();

        let result = resolver.resolve("anything", "", &map).await.unwrap();
        assert!(result.backend_node_id.is_none());
    }

    #[tokio::test]
    async fn no_match_omits_the_index() {
        let model: Arc<dyn ModelCapability> =
            Arc::new(ScriptedModel::new([r#"{"thinking":"nothing matches"}"#.to_string()]));
        let resolver = LocatorResolver::new(model);
        let map: SelectorMap = HashMap::new();

        let result = resolver.resolve("a unicorn button", "", &map).await.unwrap();
        assert!(result.backend_node_id.is_none());
    }
}
