use thiserror::Error;

use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum TypeTextError {
    #[error("tool disabled by policy")]
    Disabled,
    #[error("text exceeds max length ({0})")]
    TextTooLong(usize),
    #[error("field is readonly")]
    ReadOnly,
    #[error("field disabled")]
    DisabledField,
    #[error("mode not allowed")]
    ModeNotAllowed,
    #[error("paste requires permission")]
    PasteDenied,
    #[error("precheck failed: {0}")]
    Precheck(String),
    #[error("self heal unavailable")]
    SelfHealUnavailable,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<TypeTextError> for WayfarerError {
    fn from(err: TypeTextError) -> Self {
        match err {
            TypeTextError::Cancelled => WayfarerError::user_cancelled(),
            TypeTextError::Precheck(ref detail) => {
                WayfarerError::new(ErrorKind::ElementOccluded, format!("precheck failed: {detail}"))
                    .with_long_term_memory("The field failed a visibility/clickability check; re-observe before retrying.")
            }
            TypeTextError::ReadOnly | TypeTextError::DisabledField => {
                WayfarerError::new(ErrorKind::ElementOccluded, err.to_string())
                    .with_long_term_memory("This field cannot accept text right now; look for a different target or an unlock action.")
            }
            TypeTextError::SelfHealUnavailable => WayfarerError::new(ErrorKind::ElementNotFound, err.to_string()),
            TypeTextError::Disabled
            | TypeTextError::TextTooLong(_)
            | TypeTextError::ModeNotAllowed
            | TypeTextError::PasteDenied => WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string()),
        }
    }
}
