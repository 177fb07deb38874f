use thiserror::Error;
use wayfarer_core::WayfarerError;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("structural snapshot failed: {0}")]
    Structural(#[from] wayfarer_snapshot::SnapshotError),

    #[error("screenshot capture failed: {0}")]
    Visual(#[from] wayfarer_snapshot_visual::VisualError),

    #[error("target lookup failed: {0}")]
    Target(#[from] WayfarerError),

    #[error("aggregate snapshot timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, HubError>;

impl From<HubError> for WayfarerError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Structural(inner) => inner.into(),
            HubError::Visual(inner) => inner.into(),
            HubError::Target(inner) => inner,
            HubError::Timeout(secs) => WayfarerError::timeout("snapshot_hub.perceive")
                .with_long_term_memory(format!("aggregate snapshot exceeded {secs}s")),
        }
    }
}
