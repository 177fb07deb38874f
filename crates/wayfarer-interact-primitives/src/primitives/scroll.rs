//! Scroll primitive: page-level targets (top/bottom/pixels) scroll via
//! `window.scrollTo`/`scrollBy`; element targets use the CDP
//! scroll-into-view primitive directly against a backend-node-id.

use chrono::Utc;
use tracing::{debug, info, warn};
use wayfarer_cdp::{Cdp, PageId};

use crate::primitives::DefaultElementInteractor;
use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, ScrollBehavior, ScrollTarget},
};

const SMOOTH_SCROLL_SETTLE_MS: u64 = 300;

pub async fn execute_scroll<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    target: &ScrollTarget,
    behavior: ScrollBehavior,
) -> Result<ActionReport, InteractError>
where
    C: Cdp + Send + Sync,
{
    let started_at = Utc::now();
    let start_instant = std::time::Instant::now();

    info!(
        action_id = %ctx.action_id,
        target = ?target,
        behavior = ?behavior,
        "executing scroll primitive"
    );

    if ctx.is_cancelled() {
        return Err(InteractError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(InteractError::Timeout("context deadline exceeded".to_string()));
    }

    let cdp = interactor.cdp();

    match target {
        ScrollTarget::Element(backend_node_id) => {
            debug!(element = %backend_node_id, "scrolling element into view");
            cdp.scroll_node_into_view(ctx.page, *backend_node_id).await?;
        }
        _ => {
            debug!("calculating page scroll position");
            let command = calculate_scroll_position(cdp, ctx.page, target).await?;
            perform_scroll(cdp, ctx.page, command, behavior).await?;
        }
    }

    if behavior == ScrollBehavior::Smooth {
        tokio::time::sleep(std::time::Duration::from_millis(SMOOTH_SCROLL_SETTLE_MS)).await;
    }

    let post_signals = capture_post_signals(interactor, ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(action_id = %ctx.action_id, latency_ms, "scroll completed successfully");
    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

enum ScrollCommand {
    Absolute { x: i32, y: i32 },
    Relative { dx: i32, dy: i32 },
}

async fn calculate_scroll_position<C>(cdp: &C, page: PageId, target: &ScrollTarget) -> Result<ScrollCommand, InteractError>
where
    C: Cdp + Send + Sync,
{
    match target {
        ScrollTarget::Top => Ok(ScrollCommand::Absolute { x: 0, y: 0 }),
        ScrollTarget::Bottom => {
            let expression = "(() => {\n                const scroller = document.scrollingElement || document.documentElement || document.body;\n                const currentX = Math.floor(window.scrollX || scroller.scrollLeft || 0);\n                const maxY = Math.max((scroller.scrollHeight || 0) - window.innerHeight, 0);\n                return { x: currentX, y: Math.floor(maxY) };\n            })()";

            let value = cdp.evaluate_script(page, expression).await?;
            let x = value.get("x").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
            let y = value.get("y").and_then(|v| v.as_i64()).unwrap_or(0) as i32;

            Ok(ScrollCommand::Absolute { x, y })
        }
        ScrollTarget::Element(_) => Err(InteractError::ScrollTargetInvalid(
            "element targets are handled separately".to_string(),
        )),
        ScrollTarget::Pixels(delta) => Ok(ScrollCommand::Relative { dx: 0, dy: *delta }),
    }
}

async fn perform_scroll<C>(cdp: &C, page: PageId, command: ScrollCommand, behavior: ScrollBehavior) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let behavior_str = match behavior {
        ScrollBehavior::Smooth => "smooth",
        ScrollBehavior::Instant => "auto",
    };

    let expression = match command {
        ScrollCommand::Absolute { x, y } => format!(
            "(() => {{ window.scrollTo({{ left: {x}, top: {y}, behavior: '{behavior_str}' }}); return true; }})()"
        ),
        ScrollCommand::Relative { dx, dy } => format!(
            "(() => {{ window.scrollBy({{ left: {dx}, top: {dy}, behavior: '{behavior_str}' }}); return true; }})()"
        ),
    };

    cdp.evaluate_script(page, &expression).await?;
    Ok(())
}

async fn capture_post_signals<C>(interactor: &DefaultElementInteractor<C>, ctx: &ExecCtx) -> PostSignals
where
    C: Cdp + Send + Sync,
{
    match interactor.capture_page_signals(ctx.page).await {
        Ok(signals) => signals,
        Err(err) => {
            warn!(%err, "failed to capture scroll signals");
            PostSignals::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_behavior_default_is_smooth() {
        assert_eq!(ScrollBehavior::default(), ScrollBehavior::Smooth);
    }

    #[test]
    fn scroll_target_pixels_carries_delta() {
        let target = ScrollTarget::Pixels(100);
        match target {
            ScrollTarget::Pixels(delta) => assert_eq!(delta, 100),
            _ => panic!("wrong target type"),
        }
    }
}
