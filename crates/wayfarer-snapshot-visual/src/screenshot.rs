//! Screenshot capture via the CDP adapter.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use uuid::Uuid;
use wayfarer_cdp::{Cdp, PageId};

use crate::errors::VisualError;
use crate::models::*;

pub struct ScreenshotCapture<C>
where
    C: Cdp + Send + Sync,
{
    cdp: Arc<C>,
}

impl<C> ScreenshotCapture<C>
where
    C: Cdp + Send + Sync,
{
    pub fn new(cdp: Arc<C>) -> Self {
        Self { cdp }
    }

    /// Captures the current viewport. The adapter always returns PNG bytes,
    /// so `options.format`/`options.clip` aren't consulted yet — the
    /// `TODO` lives on `Cdp::screenshot` growing JPEG/clip support, not here.
    pub async fn capture(
        &self,
        page_id: PageId,
        options: ScreenshotOptions,
    ) -> Result<Screenshot, VisualError> {
        tracing::debug!(?page_id, ?options, "capturing screenshot");

        let deadline = Duration::from_secs(30);
        let data = self.cdp.screenshot(page_id, deadline).await?;
        let (width, height) = Self::image_dimensions(&data)?;

        Ok(Screenshot {
            id: Uuid::new_v4().to_string(),
            data,
            format: ImageFormat::Png,
            width,
            height,
            timestamp: SystemTime::now(),
            page_id: format!("{:?}", page_id.0),
            capture_mode: CaptureMode::Viewport,
            clip: None,
        })
    }

    fn image_dimensions(data: &[u8]) -> Result<(u32, u32), VisualError> {
        use image::io::Reader as ImageReader;
        use std::io::Cursor;

        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| VisualError::ImageProcessing(format!("format detection failed: {e}")))?
            .decode()?;
        Ok((img.width(), img.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_options_default_is_viewport_png() {
        let options = ScreenshotOptions::default();
        assert_eq!(options.format, ImageFormat::Png);
        assert_eq!(options.capture_mode, CaptureMode::Viewport);
        assert!(options.use_cache);
    }
}
