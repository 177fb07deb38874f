//! Click primitive (spec §4.E): resolve geometry via content-quads ->
//! box-model -> bounding-rect, dispatch a synthetic mouse click at the best
//! on-screen point, falling back to `this.click()` if every geometry step
//! or dispatch step fails.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use wayfarer_cdp::{Cdp, PageId};
use wayfarer_core::BackendNodeId;

use crate::geometry::{centroid, clamp_to_viewport, pick_best_quad, Quad};
use crate::primitives::DefaultElementInteractor;
use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, WaitTier},
};

const MOUSE_MOVE_SETTLE_MS: u64 = 20;
const POST_SCROLL_SETTLE_MS: u64 = 100;

pub async fn execute_click<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    backend_node_id: BackendNodeId,
    wait_tier: WaitTier,
) -> Result<ActionReport, InteractError>
where
    C: Cdp + Send + Sync,
{
    let started_at = Utc::now();
    let start_instant = std::time::Instant::now();

    info!(
        action_id = %ctx.action_id,
        element = %backend_node_id,
        wait_tier = ?wait_tier,
        "executing click primitive"
    );

    check_ctx(ctx)?;

    match dispatch_synthetic_click(interactor.cdp(), ctx.page, backend_node_id).await {
        Ok(()) => debug!(element = %backend_node_id, "synthetic click dispatched"),
        Err(err) => {
            warn!(element = %backend_node_id, %err, "synthetic click failed, falling back to this.click()");
            fallback_click(interactor.cdp(), ctx.page, backend_node_id).await?;
        }
    }

    if wait_tier != WaitTier::None {
        interactor.wait_strategy().wait(ctx.page, wait_tier).await?;
    }

    let post_signals = capture_post_signals(interactor, ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(action_id = %ctx.action_id, latency_ms, "click completed successfully");
    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

/// Steps 1-6 of the click algorithm; any failure here triggers the
/// `this.click()` fallback in the caller.
async fn dispatch_synthetic_click<C>(
    cdp: &C,
    page: PageId,
    backend_node_id: BackendNodeId,
) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let (viewport_width, viewport_height) = cdp.viewport_size(page).await?;

    cdp.scroll_node_into_view(page, backend_node_id).await?;
    tokio::time::sleep(Duration::from_millis(POST_SCROLL_SETTLE_MS)).await;

    let quad = resolve_click_quad(cdp, page, backend_node_id, viewport_width, viewport_height).await?;
    let (x, y) = clamp_to_viewport(centroid(&quad), viewport_width, viewport_height);

    cdp.dispatch_mouse_event(page, "mouseMoved", x, y, "none", 0, 0).await?;
    tokio::time::sleep(Duration::from_millis(MOUSE_MOVE_SETTLE_MS)).await;
    cdp.dispatch_mouse_event(page, "mousePressed", x, y, "left", 1, 0).await?;
    cdp.dispatch_mouse_event(page, "mouseReleased", x, y, "left", 1, 0).await?;

    Ok(())
}

/// content-quads -> box-model -> `getBoundingClientRect`, in priority order;
/// whichever step returns a candidate is then run through `pick_best_quad`
/// against the viewport (a no-op when there is only one candidate).
async fn resolve_click_quad<C>(
    cdp: &C,
    page: PageId,
    backend_node_id: BackendNodeId,
    viewport_width: f64,
    viewport_height: f64,
) -> Result<Quad, InteractError>
where
    C: Cdp + Send + Sync,
{
    if let Some(quad) = cdp.content_quads(page, backend_node_id).await? {
        if let Some(best) = pick_best_quad(&[quad], viewport_width, viewport_height) {
            return Ok(best);
        }
    }
    if let Some(quad) = cdp.box_model(page, backend_node_id).await? {
        if let Some(best) = pick_best_quad(&[quad], viewport_width, viewport_height) {
            return Ok(best);
        }
    }

    let object_id = cdp.resolve_backend_node(page, backend_node_id).await?;
    let value = cdp
        .call_function_on(page, &object_id, BOUNDING_RECT_QUAD_FN, Vec::new())
        .await?;
    let quad = quad_from_rect_value(&value)
        .ok_or_else(|| InteractError::NotInteractable(backend_node_id, "no bounding geometry".into()))?;
    pick_best_quad(&[quad], viewport_width, viewport_height)
        .ok_or_else(|| InteractError::NotInteractable(backend_node_id, "degenerate bounding rect".into()))
}

/// `this.click()` invoked in the page, the last-resort fallback per spec §4.E.
async fn fallback_click<C>(cdp: &C, page: PageId, backend_node_id: BackendNodeId) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let object_id = cdp.resolve_backend_node(page, backend_node_id).await?;
    cdp.call_function_on(page, &object_id, "function() { this.click(); return true; }", Vec::new())
        .await?;
    Ok(())
}

const BOUNDING_RECT_QUAD_FN: &str = "function() {\n    const r = this.getBoundingClientRect();\n    return [r.left, r.top, r.right, r.top, r.right, r.bottom, r.left, r.bottom];\n}";

fn quad_from_rect_value(value: &Value) -> Option<Quad> {
    let arr = value.as_array()?;
    if arr.len() != 8 {
        return None;
    }
    let mut quad = [0.0; 8];
    for (i, slot) in quad.iter_mut().enumerate() {
        *slot = arr[i].as_f64()?;
    }
    if quad.iter().all(|v| *v == 0.0) {
        return None;
    }
    Some(quad)
}

fn check_ctx(ctx: &ExecCtx) -> Result<(), InteractError> {
    if ctx.is_cancelled() {
        return Err(InteractError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(InteractError::Timeout("context deadline exceeded".to_string()));
    }
    Ok(())
}

async fn capture_post_signals<C>(interactor: &DefaultElementInteractor<C>, ctx: &ExecCtx) -> PostSignals
where
    C: Cdp + Send + Sync,
{
    match interactor.capture_page_signals(ctx.page).await {
        Ok(signals) => signals,
        Err(err) => {
            warn!(%err, "failed to capture click signals");
            PostSignals::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_rect_quad_is_rejected_when_all_zero() {
        let value = serde_json::json!([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(quad_from_rect_value(&value).is_none());
    }

    #[test]
    fn bounding_rect_quad_parses_eight_numbers() {
        let value = serde_json::json!([1.0, 2.0, 3.0, 2.0, 3.0, 4.0, 1.0, 4.0]);
        let quad = quad_from_rect_value(&value).unwrap();
        assert_eq!(quad, [1.0, 2.0, 3.0, 2.0, 3.0, 4.0, 1.0, 4.0]);
    }

    #[test]
    fn mismatched_array_length_is_rejected() {
        let value = serde_json::json!([1.0, 2.0, 3.0]);
        assert!(quad_from_rect_value(&value).is_none());
    }
}
