//! Screenshot capture for the browser state summary (spec §4.C visual perception).
//!
//! Scoped to capturing and caching raw screenshot bytes for one target; OCR,
//! visual diffing, and element classification are out of scope here.

pub mod cache;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod screenshot;

pub use cache::ScreenshotCache;
pub use errors::VisualError;
pub use metrics::{record_capture, snapshot, VisualMetrics};
pub use models::*;
pub use screenshot::ScreenshotCapture;
