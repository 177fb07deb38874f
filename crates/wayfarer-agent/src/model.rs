//! The model capability the agent loop talks to: `chat(messages) -> text`.
//! Kept to this one required method per the external-interface contract;
//! a `chatWithTools` variant is deliberately not modelled since the registry
//! already gives every provider the same JSON-schema-driven prompt.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use wayfarer_composer::Message;
use wayfarer_core::WayfarerError;

use crate::errors::AgentLoopError;

#[async_trait]
pub trait ModelCapability: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<String, WayfarerError>;
}

/// Deterministic provider for tests: replays a fixed script of replies,
/// erroring once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()) }
    }
}

#[async_trait]
impl ModelCapability for ScriptedModel {
    async fn chat(&self, _messages: &[Message]) -> Result<String, WayfarerError> {
        let mut replies = self.replies.lock().await;
        replies.pop_front().ok_or(AgentLoopError::EmptyResponse).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_model_replays_in_order() {
        let model = ScriptedModel::new(["first".to_string(), "second".to_string()]);
        assert_eq!(model.chat(&[]).await.unwrap(), "first");
        assert_eq!(model.chat(&[]).await.unwrap(), "second");
        assert!(model.chat(&[]).await.is_err());
    }
}
