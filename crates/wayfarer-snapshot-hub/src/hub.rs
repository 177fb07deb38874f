//! Fans structural, visual, and tab-list perception in for one target into a
//! single [`AggregateSnapshot`], ready for the serialiser to turn into a
//! `BrowserStateView`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use wayfarer_cdp::Cdp;
use wayfarer_core::TargetId;
use wayfarer_snapshot::{SnapshotCollector, StructuralCollector};
use wayfarer_snapshot_visual::ScreenshotCapture;
use wayfarer_targets::TargetManagerImpl;

use crate::errors::{HubError, Result};
use crate::models::{AggregateSnapshot, PerceptionOptions, TabSummary};

#[async_trait]
pub trait PerceptionHub: Send + Sync {
    async fn perceive(&self, target: TargetId, options: PerceptionOptions)
        -> Result<AggregateSnapshot>;
}

pub struct PerceptionHubImpl<C>
where
    C: Cdp + Send + Sync,
{
    structural: Arc<StructuralCollector<C>>,
    visual: Arc<ScreenshotCapture<C>>,
    targets: Arc<TargetManagerImpl>,
}

impl<C> PerceptionHubImpl<C>
where
    C: Cdp + Send + Sync,
{
    pub fn new(cdp: Arc<C>, targets: Arc<TargetManagerImpl>) -> Self {
        Self {
            structural: Arc::new(StructuralCollector::new(cdp.clone())),
            visual: Arc::new(ScreenshotCapture::new(cdp)),
            targets,
        }
    }

    async fn gather(&self, target: TargetId, options: PerceptionOptions) -> Result<AggregateSnapshot> {
        let ctx = self.targets.get_target(&target).map_err(HubError::Target)?;

        let structural = self.structural.collect(ctx.cdp_page).await?;

        let screenshot = if options.capture_screenshot {
            Some(
                self.visual
                    .capture(ctx.cdp_page, options.screenshot_options.clone())
                    .await?,
            )
        } else {
            None
        };

        let tabs = self
            .targets
            .list_targets(&ctx.session)
            .into_iter()
            .map(|t| TabSummary {
                active: t.id == target,
                id: t.id,
                url: t.url,
                title: t.title,
            })
            .collect();

        Ok(AggregateSnapshot {
            target,
            structural,
            screenshot,
            tabs,
            collected_at: Utc::now(),
        })
    }
}

#[async_trait]
impl<C> PerceptionHub for PerceptionHubImpl<C>
where
    C: Cdp + Send + Sync,
{
    async fn perceive(
        &self,
        target: TargetId,
        options: PerceptionOptions,
    ) -> Result<AggregateSnapshot> {
        let timeout = Duration::from_secs(options.timeout_secs);
        let timeout_secs = options.timeout_secs;
        tokio::time::timeout(timeout, self.gather(target, options))
            .await
            .map_err(|_| HubError::Timeout(timeout_secs))?
    }
}
