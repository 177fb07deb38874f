#![allow(dead_code)]

use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found")]
    NotFound,
    #[error("route stale")]
    RouteStale,
    #[error("ownership conflict")]
    OwnershipConflict,
    #[error("limit reached")]
    LimitReached,
    #[error("internal error")]
    Internal,
}

impl RegistryError {
    fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound => ErrorKind::ElementNotFound,
            RegistryError::RouteStale => ErrorKind::Navigation,
            RegistryError::OwnershipConflict => ErrorKind::Browser,
            RegistryError::LimitReached => ErrorKind::Browser,
            RegistryError::Internal => ErrorKind::Browser,
        }
    }

    pub fn into_wayfarer_error(self, detail: impl Into<String>) -> WayfarerError {
        let kind = self.kind();
        let message = format!("{}: {}", self, detail.into());
        WayfarerError::new(kind, message)
    }
}
