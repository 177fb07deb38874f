//! Error types for element interaction primitives (spec §4.E).

use thiserror::Error;
use wayfarer_core::{BackendNodeId, ErrorKind, WayfarerError};

/// Errors raised by click/fill/scroll/select/wait primitives.
#[derive(Debug, Error, Clone)]
pub enum InteractError {
    #[error(transparent)]
    Cdp(#[from] wayfarer_cdp::AdapterError),

    /// The backend-node-id no longer resolves to a node (page changed under us).
    #[error("element {0} not found")]
    ElementNotFound(BackendNodeId),

    /// Every click/fill strategy (content-quads, box-model, bounding-rect,
    /// `this.click()`) failed.
    #[error("element {0} not interactable: {1}")]
    NotInteractable(BackendNodeId, String),

    /// A `select_option` call whose value/text/index matched nothing.
    #[error("option not found: {0}")]
    OptionNotFound(String),

    /// A scroll/wait/layout step exhausted its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The action's cancellation token fired mid-step.
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// A scroll target (top/bottom/element) could not be resolved.
    #[error("scroll target invalid: {0}")]
    ScrollTargetInvalid(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl InteractError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether retrying the same primitive without re-observing might help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InteractError::Timeout(_) | InteractError::Cdp(_) | InteractError::NotInteractable(_, _)
        )
    }

    /// Severity level: 0=low, 1=medium, 2=high, 3=critical.
    pub fn severity(&self) -> u8 {
        match self {
            InteractError::Internal(_) => 3,
            InteractError::Cdp(_) => 2,
            InteractError::Timeout(_) | InteractError::NotInteractable(_, _) => 1,
            _ => 0,
        }
    }
}

impl From<InteractError> for WayfarerError {
    fn from(err: InteractError) -> Self {
        match err {
            InteractError::Cdp(inner) => inner.into(),
            InteractError::ElementNotFound(id) => WayfarerError::element_not_found(id.0 as u32),
            InteractError::NotInteractable(id, reason) => {
                WayfarerError::new(ErrorKind::ElementOccluded, format!("element {id} not interactable: {reason}"))
                    .with_long_term_memory(format!(
                        "Element {id} could not be interacted with ({reason}); re-observe and try a different element."
                    ))
            }
            InteractError::OptionNotFound(ref detail) => {
                WayfarerError::new(ErrorKind::ElementNotFound, format!("option not found: {detail}"))
                    .with_long_term_memory("The requested dropdown option does not exist; re-observe the element's options.")
            }
            InteractError::Timeout(ref detail) => WayfarerError::timeout(detail),
            InteractError::Interrupted(detail) => {
                WayfarerError::new(ErrorKind::UserCancelled, detail).recoverable(false)
            }
            InteractError::ScrollTargetInvalid(detail) => {
                WayfarerError::new(ErrorKind::ElementNotFound, format!("scroll target invalid: {detail}"))
            }
            InteractError::Internal(detail) => WayfarerError::new(ErrorKind::Browser, detail),
        }
    }
}
