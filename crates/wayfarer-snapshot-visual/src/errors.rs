use thiserror::Error;
use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Error)]
pub enum VisualError {
    #[error(transparent)]
    Cdp(#[from] wayfarer_cdp::AdapterError),
    #[error("image processing error: {0}")]
    ImageProcessing(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<image::ImageError> for VisualError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing(err.to_string())
    }
}

impl From<VisualError> for WayfarerError {
    fn from(err: VisualError) -> Self {
        match err {
            VisualError::Cdp(inner) => inner.into(),
            VisualError::ImageProcessing(msg) => WayfarerError::new(ErrorKind::Browser, msg),
            VisualError::InvalidInput(msg) => {
                WayfarerError::new(ErrorKind::InvalidActionSchema, msg)
            }
        }
    }
}
