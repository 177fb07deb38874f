use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Cdp(#[from] wayfarer_cdp::AdapterError),
    #[error("malformed snapshot payload: {0}")]
    MalformedSnapshot(String),
    #[error("snapshot has no root node")]
    MissingRoot,
    #[error("internal error: {0}")]
    Internal(String),
}

impl SnapshotError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<SnapshotError> for WayfarerError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Cdp(inner) => inner.into(),
            SnapshotError::MalformedSnapshot(ref msg) => {
                WayfarerError::new(ErrorKind::Browser, msg.clone())
                    .with_long_term_memory("The page returned a snapshot that could not be parsed; retry the observation.")
            }
            SnapshotError::MissingRoot => {
                WayfarerError::new(ErrorKind::Browser, "snapshot has no root node")
                    .with_long_term_memory("The page produced no document root; it may not have finished loading.")
            }
            SnapshotError::Internal(msg) => WayfarerError::new(ErrorKind::Browser, msg),
        }
    }
}
