use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("event bus closed")]
    Closed,
    #[error("timed out waiting for event matching '{0}'")]
    Timeout(String),
}

impl From<EventBusError> for WayfarerError {
    fn from(value: EventBusError) -> Self {
        match value {
            EventBusError::Timeout(pattern) => WayfarerError::timeout(&format!("waitFor({pattern})")),
            EventBusError::Closed => WayfarerError::new(ErrorKind::Browser, value.to_string()),
        }
    }
}
