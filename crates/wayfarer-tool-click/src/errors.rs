use thiserror::Error;

use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum ClickError {
    #[error("tool disabled by policy")]
    Disabled,
    #[error("precheck failed: {0}")]
    Precheck(String),
    #[error("policy rejected button")]
    ButtonNotAllowed,
    #[error("offset out of range")]
    OffsetOutOfRange,
    #[error("self heal unavailable")]
    SelfHealUnavailable,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<ClickError> for WayfarerError {
    fn from(err: ClickError) -> Self {
        match err {
            ClickError::Cancelled => WayfarerError::user_cancelled(),
            ClickError::Precheck(ref detail) => {
                WayfarerError::new(ErrorKind::ElementOccluded, format!("precheck failed: {detail}"))
                    .with_long_term_memory("The element failed a visibility/clickability check; re-observe before retrying.")
            }
            ClickError::SelfHealUnavailable => WayfarerError::new(ErrorKind::ElementNotFound, err.to_string()),
            ClickError::Disabled | ClickError::ButtonNotAllowed | ClickError::OffsetOutOfRange => {
                WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string())
            }
        }
    }
}
