use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("unsupported config path: {0}")]
    UnsupportedPath(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for WayfarerError {
    fn from(value: ConfigError) -> Self {
        WayfarerError::new(ErrorKind::Browser, value.to_string())
    }
}
