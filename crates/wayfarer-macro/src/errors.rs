//! Macro persistence and validation errors.

use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("invalid macro file name \"{name}\": {reason}")]
    InvalidFileName { name: String, reason: String },

    #[error("macro not found: {0}")]
    NotFound(String),

    #[error("macro already exists: {0}")]
    AlreadyExists(String),

    #[error("macro storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("macro JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<MacroError> for WayfarerError {
    fn from(err: MacroError) -> Self {
        match err {
            MacroError::NotFound(ref id) => {
                WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string())
                    .with_long_term_memory(format!("No macro named \"{id}\" exists."))
            }
            other => WayfarerError::new(ErrorKind::Browser, other.to_string()),
        }
    }
}
