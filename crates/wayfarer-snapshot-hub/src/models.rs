//! The aggregate snapshot fanned in from the structural, visual, and target
//! perceivers, handed onward to the serialiser for rendering into a
//! `BrowserStateView`.

use chrono::{DateTime, Utc};
use wayfarer_core::TargetId;
use wayfarer_snapshot::Snapshot;
use wayfarer_snapshot_visual::Screenshot;

#[derive(Clone, Debug)]
pub struct TabSummary {
    pub id: TargetId,
    pub url: Option<String>,
    pub title: Option<String>,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct AggregateSnapshot {
    pub target: TargetId,
    pub structural: Snapshot,
    pub screenshot: Option<Screenshot>,
    pub tabs: Vec<TabSummary>,
    pub collected_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct PerceptionOptions {
    pub capture_screenshot: bool,
    pub screenshot_options: wayfarer_snapshot_visual::ScreenshotOptions,
    pub timeout_secs: u64,
}

impl Default for PerceptionOptions {
    fn default() -> Self {
        Self {
            capture_screenshot: true,
            screenshot_options: wayfarer_snapshot_visual::ScreenshotOptions::default(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_capture_with_a_thirty_second_budget() {
        let options = PerceptionOptions::default();
        assert!(options.capture_screenshot);
        assert_eq!(options.timeout_secs, 30);
    }

    #[test]
    fn tab_summary_tracks_which_tab_is_active() {
        let target = TargetId::new();
        let tab = TabSummary {
            id: target.clone(),
            url: Some("https://example.com".to_string()),
            title: None,
            active: true,
        };
        assert_eq!(tab.id, target);
        assert!(tab.active);
    }
}
