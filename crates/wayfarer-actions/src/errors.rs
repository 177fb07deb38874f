use thiserror::Error;

use wayfarer_core::{ErrorKind, WayfarerError};

/// Errors raised by the registry itself, before a handler ever runs.
#[derive(Debug, Error)]
pub enum ActionRegistryError {
    #[error("unknown action type: {0}")]
    UnknownAction(String),
    #[error("invalid parameters for {action}: {reasons:?}")]
    InvalidParams { action: String, reasons: Vec<String> },
    #[error("action already registered: {0}")]
    DuplicateAction(String),
}

impl From<ActionRegistryError> for WayfarerError {
    fn from(err: ActionRegistryError) -> Self {
        match err {
            ActionRegistryError::UnknownAction(ref name) => {
                WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string())
                    .with_long_term_memory(format!("\"{name}\" is not a known action; check the available action list."))
            }
            ActionRegistryError::InvalidParams { ref action, ref reasons } => {
                WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string()).with_long_term_memory(format!(
                    "The parameters for \"{action}\" were rejected: {}. Re-check the action's schema and retry.",
                    reasons.join("; ")
                ))
            }
            ActionRegistryError::DuplicateAction(_) => WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string()),
        }
    }
}
