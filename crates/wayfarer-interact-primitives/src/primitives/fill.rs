//! Fill primitive (spec §4.E): focus an element through three fallback
//! tiers, optionally clear it, then type character by character dispatching
//! synthetic `keyDown` -> `char` -> `keyUp` events.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use wayfarer_cdp::{Cdp, PageId};
use wayfarer_core::BackendNodeId;

use crate::geometry::{centroid, clamp_to_viewport, pick_best_quad};
use crate::keyboard::{backspace_key_event, delete_key_event, enter_key_event, key_event_for_char, PER_KEY_DELAY_MS};
use crate::primitives::DefaultElementInteractor;
use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, WaitTier},
};

const FOCUS_SETTLE_MS: u64 = 50;

pub async fn execute_fill<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    backend_node_id: BackendNodeId,
    value: &str,
    clear: bool,
    submit: bool,
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
        value_length = value.len(),
        clear,
        submit,
        "executing fill primitive"
    );

    if ctx.is_cancelled() {
        return Err(InteractError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(InteractError::Timeout("context deadline exceeded".to_string()));
    }

    let cdp = interactor.cdp();
    let page = ctx.page;

    cdp.scroll_node_into_view(page, backend_node_id).await?;
    tokio::time::sleep(std::time::Duration::from_millis(FOCUS_SETTLE_MS)).await;

    focus_element(cdp, page, backend_node_id).await?;

    if clear {
        clear_via_script(cdp, page, backend_node_id).await?;
    }

    type_value(cdp, page, value).await?;

    if submit {
        trigger_submit(cdp, page).await?;
    }

    if wait_tier != WaitTier::None {
        interactor.wait_strategy().wait(page, wait_tier).await?;
    }

    let post_signals = capture_post_signals(interactor, ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(action_id = %ctx.action_id, latency_ms, "fill completed successfully");
    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

/// Three-tier focus: CDP `DOM.focus` -> JS `this.focus()` -> click at centre.
async fn focus_element<C>(cdp: &C, page: PageId, backend_node_id: BackendNodeId) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    if cdp.focus_node(page, backend_node_id).await.is_ok() {
        return Ok(());
    }

    let object_id = cdp.resolve_backend_node(page, backend_node_id).await?;
    if cdp
        .call_function_on(page, &object_id, "function() { this.focus(); return true; }", Vec::new())
        .await
        .is_ok()
    {
        return Ok(());
    }

    warn!(element = %backend_node_id, "focus fallback via this.focus() failed, clicking at centre");
    click_at_centre(cdp, page, backend_node_id, &object_id).await
}

async fn click_at_centre<C>(
    cdp: &C,
    page: PageId,
    backend_node_id: BackendNodeId,
    object_id: &str,
) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let (viewport_width, viewport_height) = cdp.viewport_size(page).await?;
    let quad = if let Some(quad) = cdp.content_quads(page, backend_node_id).await? {
        quad
    } else if let Some(quad) = cdp.box_model(page, backend_node_id).await? {
        quad
    } else {
        let value = cdp
            .call_function_on(
                page,
                object_id,
                "function() {\n    const r = this.getBoundingClientRect();\n    return [r.left, r.top, r.right, r.top, r.right, r.bottom, r.left, r.bottom];\n}",
                Vec::new(),
            )
            .await?;
        quad_from_value(&value)
            .ok_or_else(|| InteractError::NotInteractable(backend_node_id, "no bounding geometry".into()))?
    };

    let quad = pick_best_quad(&[quad], viewport_width, viewport_height)
        .ok_or_else(|| InteractError::NotInteractable(backend_node_id, "degenerate geometry".into()))?;
    let (x, y) = clamp_to_viewport(centroid(&quad), viewport_width, viewport_height);

    cdp.dispatch_mouse_event(page, "mouseMoved", x, y, "none", 0, 0).await?;
    cdp.dispatch_mouse_event(page, "mousePressed", x, y, "left", 1, 0).await?;
    cdp.dispatch_mouse_event(page, "mouseReleased", x, y, "left", 1, 0).await?;
    Ok(())
}

fn quad_from_value(value: &Value) -> Option<[f64; 8]> {
    let arr = value.as_array()?;
    if arr.len() != 8 {
        return None;
    }
    let mut quad = [0.0; 8];
    for (i, slot) in quad.iter_mut().enumerate() {
        *slot = arr[i].as_f64()?;
    }
    Some(quad)
}

/// Clears the field's value directly and verifies the readback, rather than
/// relying on select-all-then-delete (some custom inputs ignore selection).
async fn clear_via_script<C>(cdp: &C, page: PageId, backend_node_id: BackendNodeId) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let object_id = cdp.resolve_backend_node(page, backend_node_id).await?;
    let script = "function() {\n    this.value = '';\n    this.dispatchEvent(new Event('input', { bubbles: true }));\n    this.dispatchEvent(new Event('change', { bubbles: true }));\n    return this.value;\n}";
    let value = cdp.call_function_on(page, &object_id, script, Vec::new()).await?;
    let cleared = value.as_str().map(str::is_empty).unwrap_or(false);
    if !cleared {
        warn!(element = %backend_node_id, "clear readback was non-empty, falling back to select-all+delete");
        return clear_via_keys(cdp, page, backend_node_id).await;
    }
    Ok(())
}

async fn clear_via_keys<C>(cdp: &C, page: PageId, backend_node_id: BackendNodeId) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let (viewport_width, viewport_height) = cdp.viewport_size(page).await?;
    if let Some(quad) = cdp.content_quads(page, backend_node_id).await? {
        if let Some(quad) = pick_best_quad(&[quad], viewport_width, viewport_height) {
            let (x, y) = clamp_to_viewport(centroid(&quad), viewport_width, viewport_height);
            for _ in 0..3 {
                cdp.dispatch_mouse_event(page, "mousePressed", x, y, "left", 1, 0).await?;
                cdp.dispatch_mouse_event(page, "mouseReleased", x, y, "left", 1, 0).await?;
            }
        }
    }

    let delete = delete_key_event();
    cdp.dispatch_key_event(page, "keyDown", delete.modifiers, delete.windows_virtual_key_code, delete.key, delete.code, None)
        .await?;
    cdp.dispatch_key_event(page, "keyUp", delete.modifiers, delete.windows_virtual_key_code, delete.key, delete.code, None)
        .await?;
    let backspace = backspace_key_event();
    cdp.dispatch_key_event(
        page,
        "keyDown",
        backspace.modifiers,
        backspace.windows_virtual_key_code,
        backspace.key,
        backspace.code,
        None,
    )
    .await?;
    cdp.dispatch_key_event(
        page,
        "keyUp",
        backspace.modifiers,
        backspace.windows_virtual_key_code,
        backspace.key,
        backspace.code,
        None,
    )
    .await
    .map_err(InteractError::from)
}

async fn type_value<C>(cdp: &C, page: PageId, value: &str) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    for ch in value.chars() {
        let spec = key_event_for_char(ch);
        let text = if ch == '\n' || ch == '\r' { None } else { Some(ch.to_string()) };

        cdp.dispatch_key_event(
            page,
            "keyDown",
            spec.modifiers,
            spec.windows_virtual_key_code,
            &spec.key,
            &spec.code,
            text.as_deref(),
        )
        .await?;

        if let Some(text) = text.as_deref() {
            cdp.dispatch_key_event(page, "char", spec.modifiers, spec.windows_virtual_key_code, &spec.key, &spec.code, Some(text))
                .await?;
        }

        cdp.dispatch_key_event(page, "keyUp", spec.modifiers, spec.windows_virtual_key_code, &spec.key, &spec.code, None)
            .await?;

        tokio::time::sleep(std::time::Duration::from_millis(PER_KEY_DELAY_MS)).await;
    }
    Ok(())
}

/// Dispatches an explicit Enter sequence to whatever currently holds focus,
/// matching the way a real keyboard submits a form.
async fn trigger_submit<C>(cdp: &C, page: PageId) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let enter = enter_key_event();
    cdp.dispatch_key_event(page, "keyDown", enter.modifiers, enter.windows_virtual_key_code, enter.key, enter.code, None)
        .await?;
    cdp.dispatch_key_event(page, "keyUp", enter.modifiers, enter.windows_virtual_key_code, enter.key, enter.code, None)
        .await?;
    Ok(())
}

async fn capture_post_signals<C>(interactor: &DefaultElementInteractor<C>, ctx: &ExecCtx) -> PostSignals
where
    C: Cdp + Send + Sync,
{
    match interactor.capture_page_signals(ctx.page).await {
        Ok(signals) => signals,
        Err(err) => {
            warn!(%err, "failed to capture fill signals");
            PostSignals::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_from_value_rejects_wrong_length() {
        let value = serde_json::json!([1.0, 2.0, 3.0]);
        assert!(quad_from_value(&value).is_none());
    }

    #[test]
    fn quad_from_value_parses_eight_numbers() {
        let value = serde_json::json!([0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert_eq!(quad_from_value(&value), Some([0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]));
    }
}
