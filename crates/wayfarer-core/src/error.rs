//! Error taxonomy (spec §4.J, §7).
//!
//! Every fallible operation in the runtime eventually produces a
//! [`WayfarerError`]: a human message, a `recoverable` flag, and two memory
//! strings — `long_term_memory` is what the model sees on the next turn,
//! `short_term_memory` is debug detail that never reaches the model. Recoverable
//! errors are folded into an [`ActionResult`](crate::action::ActionResult) by the
//! action registry; non-recoverable ones abort the agent loop.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// The error kinds named in spec §4.J / §7. Kinds are data, not separate Rust
/// types, so a single `Result<T, WayfarerError>` threads through every crate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ErrorKind {
    #[error("transport is dead")]
    TransportDead,
    #[error("page crashed")]
    PageCrash,
    #[error("navigation failed")]
    Navigation,
    #[error("element not found")]
    ElementNotFound,
    #[error("element occluded or stale")]
    ElementOccluded,
    #[error("operation timed out")]
    Timeout,
    #[error("action schema invalid")]
    InvalidActionSchema,
    #[error("model response unparseable")]
    ModelUnparseable,
    #[error("user cancelled")]
    UserCancelled,
    #[error("browser error")]
    Browser,
}

impl ErrorKind {
    /// Whether this kind of error is recoverable *by default* — callers may
    /// still override with [`WayfarerError::recoverable`]; `TransportDead` and
    /// `PageCrash` are the only kinds that are fatal per spec §7.
    pub fn default_recoverable(self) -> bool {
        !matches!(self, ErrorKind::TransportDead | ErrorKind::PageCrash)
    }
}

#[derive(Clone, Debug)]
pub struct WayfarerError {
    pub kind: ErrorKind,
    message: String,
    long_term_memory: Option<String>,
    short_term_memory: Option<String>,
    code: Option<String>,
    recoverable: bool,
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl WayfarerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let recoverable = kind.default_recoverable();
        Self {
            kind,
            message: message.into(),
            long_term_memory: None,
            short_term_memory: None,
            code: None,
            recoverable,
            cause: None,
        }
    }

    pub fn with_long_term_memory(mut self, text: impl Into<String>) -> Self {
        self.long_term_memory = Some(text.into());
        self
    }

    pub fn with_short_term_memory(mut self, text: impl Into<String>) -> Self {
        self.short_term_memory = Some(text.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn recoverable(mut self, flag: bool) -> Self {
        self.recoverable = flag;
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The message the model should see on its next turn, falling back to the
    /// human message when the caller didn't set one explicitly.
    pub fn long_term_memory(&self) -> &str {
        self.long_term_memory.as_deref().unwrap_or(&self.message)
    }

    pub fn short_term_memory(&self) -> Option<&str> {
        self.short_term_memory.as_deref()
    }

    pub fn timeout(op: &str) -> Self {
        Self::new(ErrorKind::Timeout, format!("{op} timed out"))
            .with_long_term_memory(format!("The {op} operation timed out; try again or a different approach."))
    }

    pub fn element_not_found(index: u32) -> Self {
        Self::new(
            ErrorKind::ElementNotFound,
            format!("element at index {index} not found in the current selector map"),
        )
        .with_long_term_memory(format!(
            "Index {index} no longer refers to an element; the page may have changed — re-observe before retrying."
        ))
    }

    pub fn user_cancelled() -> Self {
        Self::new(ErrorKind::UserCancelled, "cancelled by user").recoverable(false)
    }
}

impl fmt::Display for WayfarerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for WayfarerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_dead_is_not_recoverable_by_default() {
        let err = WayfarerError::new(ErrorKind::TransportDead, "socket closed");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn element_not_found_is_recoverable_and_carries_long_term_memory() {
        let err = WayfarerError::element_not_found(7);
        assert!(err.is_recoverable());
        assert!(err.long_term_memory().contains("Index 7"));
    }

    #[test]
    fn explicit_recoverable_override_wins() {
        let err = WayfarerError::new(ErrorKind::PageCrash, "gone").recoverable(true);
        assert!(err.is_recoverable());
    }
}
