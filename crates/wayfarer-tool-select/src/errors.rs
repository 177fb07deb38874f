use thiserror::Error;

use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("tool disabled by policy")]
    Disabled,
    #[error("mode not permitted")]
    ModeNotAllowed,
    #[error("field is readonly")]
    ReadOnly,
    #[error("field disabled")]
    DisabledField,
    #[error("option not found for target")]
    OptionMissing,
    #[error("invalid selection target: {0}")]
    InvalidTarget(String),
    #[error("precheck failed: {0}")]
    Precheck(String),
    #[error("self heal unavailable")]
    SelfHealUnavailable,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<SelectError> for WayfarerError {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::Cancelled => WayfarerError::user_cancelled(),
            SelectError::Precheck(ref detail) => {
                WayfarerError::new(ErrorKind::ElementOccluded, format!("precheck failed: {detail}"))
                    .with_long_term_memory("The control failed a visibility/clickability check; re-observe before retrying.")
            }
            SelectError::ReadOnly | SelectError::DisabledField => {
                WayfarerError::new(ErrorKind::ElementOccluded, err.to_string())
                    .with_long_term_memory("This control cannot be changed right now; look for a different target or an unlock action.")
            }
            SelectError::SelfHealUnavailable => WayfarerError::new(ErrorKind::ElementNotFound, err.to_string()),
            SelectError::OptionMissing => WayfarerError::new(ErrorKind::ElementNotFound, err.to_string())
                .with_long_term_memory("The requested option does not exist on this control; re-list its options before retrying."),
            SelectError::Disabled | SelectError::ModeNotAllowed | SelectError::InvalidTarget(_) => {
                WayfarerError::new(ErrorKind::InvalidActionSchema, err.to_string())
            }
        }
    }
}
