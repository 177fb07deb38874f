//! `ModelCapability` backed by any OpenAI-compatible chat-completions
//! endpoint. Simplified relative to the multi-key, streaming-aware provider
//! this is grounded on: one API key, one request shape, no retry-by-rotation,
//! since the agent loop already owns its own retry/backoff policy.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use wayfarer_agent::ModelCapability;
use wayfarer_composer::{Message, Role};
use wayfarer_core::{ErrorKind, WayfarerError};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiCompatibleModel {
    client: Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAiCompatibleModel {
    pub fn new(api_base: String, model: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client builds with static config");
        Self { client, api_base, model, api_key, temperature: 0.2 }
    }

    /// Resolves the endpoint, model, and API key from CLI overrides first,
    /// falling back to `WAYFARER_MODEL_API_BASE` / `WAYFARER_MODEL_NAME` /
    /// `WAYFARER_MODEL_API_KEY` so a deployment can run entirely off env vars.
    pub fn from_env(api_base: Option<String>, model: Option<String>) -> Self {
        let api_base = api_base
            .or_else(|| env::var("WAYFARER_MODEL_API_BASE").ok())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = model
            .or_else(|| env::var("WAYFARER_MODEL_NAME").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = env::var("WAYFARER_MODEL_API_KEY").ok();
        Self::new(api_base, model, api_key)
    }
}

#[async_trait]
impl ModelCapability for OpenAiCompatibleModel {
    async fn chat(&self, messages: &[Message]) -> Result<String, WayfarerError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: messages.iter().map(ChatMessage::from).collect(),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            WayfarerError::new(ErrorKind::Browser, format!("model request failed: {err}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(WayfarerError::new(
                ErrorKind::Browser,
                format!("model endpoint returned {status}: {text}"),
            ));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            WayfarerError::new(ErrorKind::ModelUnparseable, format!("model response invalid: {err}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| WayfarerError::new(ErrorKind::ModelUnparseable, "model response had no choices"))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self { role: role.to_string(), content: message.content.clone() }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: String,
}
