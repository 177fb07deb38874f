use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

/// Errors raised by the agent loop itself, distinct from the `WayfarerError`s
/// its dependencies (perception, registry, model) already raise — those pass
/// through unchanged via `?`.
#[derive(Debug, Error)]
pub enum AgentLoopError {
    #[error("model returned a reply that could not be parsed as {{thinking, action|actions}}: {0}")]
    ReplyParse(String),

    #[error("model reply contained neither `action` nor `actions`")]
    NoActions,

    #[error("model produced an empty response")]
    EmptyResponse,
}

impl From<AgentLoopError> for WayfarerError {
    fn from(err: AgentLoopError) -> Self {
        match &err {
            AgentLoopError::ReplyParse(detail) => WayfarerError::new(ErrorKind::ModelUnparseable, err.to_string())
                .with_long_term_memory("The model's reply was not valid JSON. Respond with {\"thinking\": \"...\", \"action\": {...}}.")
                .with_short_term_memory(detail.clone())
                .recoverable(true),
            AgentLoopError::NoActions => WayfarerError::new(ErrorKind::ModelUnparseable, err.to_string())
                .with_long_term_memory("Include an `action` or `actions` field in your reply.")
                .recoverable(true),
            AgentLoopError::EmptyResponse => WayfarerError::new(ErrorKind::ModelUnparseable, err.to_string())
                .with_long_term_memory("The model returned no content.")
                .recoverable(true),
        }
    }
}
