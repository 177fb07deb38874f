//! Data models for screenshot capture.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Screenshot captured from a web page, destined for
/// `BrowserStateView.screenshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: String,
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub timestamp: SystemTime,
    pub page_id: String,
    pub capture_mode: CaptureMode,
    pub clip: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CaptureMode {
    /// Capture visible viewport only.
    Viewport,
    /// Capture the entire scrollable page.
    FullPage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotOptions {
    pub format: ImageFormat,
    /// JPEG quality (0-100), only consulted for `ImageFormat::Jpeg`.
    pub quality: Option<u8>,
    pub capture_mode: CaptureMode,
    pub clip: Option<BoundingBox>,
    pub use_cache: bool,
    pub cache_ttl_secs: u64,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: None,
            capture_mode: CaptureMode::Viewport,
            clip: None,
            use_cache: true,
            cache_ttl_secs: 60,
        }
    }
}
