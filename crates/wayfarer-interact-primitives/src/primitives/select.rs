//! Select primitive: resolves the element's object reference via
//! `resolve_backend_node` and performs the lookup/selection entirely through
//! `call_function_on`, passing the sought value as a function argument
//! rather than interpolating it into the script text.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use wayfarer_cdp::{Cdp, PageId};
use wayfarer_core::BackendNodeId;

use crate::primitives::DefaultElementInteractor;
use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, SelectMethod, WaitTier},
};

pub async fn execute_select<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    backend_node_id: BackendNodeId,
    method: SelectMethod,
    item: &str,
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
        method = ?method,
        item = %item,
        wait_tier = ?wait_tier,
        "executing select primitive"
    );

    if ctx.is_cancelled() {
        return Err(InteractError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(InteractError::Timeout("context deadline exceeded".to_string()));
    }

    let cdp = interactor.cdp();
    let page = ctx.page;
    let object_id = cdp.resolve_backend_node(page, backend_node_id).await?;

    debug!("checking element is selectable");
    check_selectable(cdp, page, &object_id, backend_node_id).await?;

    debug!(method = ?method, item = %item, "selecting matching option");
    perform_select(cdp, page, &object_id, method, item).await?;

    if wait_tier != WaitTier::None {
        interactor.wait_strategy().wait(page, wait_tier).await?;
    }

    let post_signals = capture_post_signals(interactor, ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(action_id = %ctx.action_id, latency_ms, "select completed successfully");
    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

const CHECK_SELECTABLE_FN: &str = "function() {\n    const tag = (this.tagName || '').toLowerCase();\n    const role = (this.getAttribute('role') || '').toLowerCase();\n    const selectable = tag === 'select' || role === 'listbox';\n    const disabled = !!this.matches(':disabled');\n    const readonly = this.hasAttribute('readonly');\n    const style = window.getComputedStyle(this);\n    const rect = this.getBoundingClientRect();\n    const visible = style.visibility !== 'hidden' && style.display !== 'none' && (rect.width > 0 || rect.height > 0 || this.getClientRects().length > 0);\n    return { selectable, disabled, readonly, visible };\n}";

async fn check_selectable<C>(cdp: &C, page: PageId, object_id: &str, backend_node_id: BackendNodeId) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let value = cdp.call_function_on(page, object_id, CHECK_SELECTABLE_FN, Vec::new()).await?;

    if !value.get("selectable").and_then(Value::as_bool).unwrap_or(false) {
        return Err(InteractError::NotInteractable(backend_node_id, "not a select/listbox".into()));
    }
    if value.get("disabled").and_then(Value::as_bool).unwrap_or(false) {
        return Err(InteractError::NotInteractable(backend_node_id, "select is disabled".into()));
    }
    if value.get("readonly").and_then(Value::as_bool).unwrap_or(false) {
        return Err(InteractError::NotInteractable(backend_node_id, "select is readonly".into()));
    }
    if !value.get("visible").and_then(Value::as_bool).unwrap_or(false) {
        return Err(InteractError::NotInteractable(backend_node_id, "select is not visible".into()));
    }
    Ok(())
}

const SELECT_BY_TEXT_OR_VALUE_FN: &str = "function(mode, target) {\n    const options = Array.from(this.options || []);\n    const idx = options.findIndex(opt => mode === 'value' ? (opt.value ?? '') === target : (opt.text ?? '') === target);\n    if (idx < 0) { return { status: 'not-found' }; }\n    this.selectedIndex = idx;\n    this.dispatchEvent(new Event('input', { bubbles: true }));\n    this.dispatchEvent(new Event('change', { bubbles: true }));\n    return { status: 'ok', value: options[idx].value };\n}";

const SELECT_BY_INDEX_FN: &str = "function(index) {\n    const options = Array.from(this.options || []);\n    if (index < 0 || index >= options.length) { return { status: 'out-of-range', length: options.length }; }\n    this.selectedIndex = index;\n    this.dispatchEvent(new Event('input', { bubbles: true }));\n    this.dispatchEvent(new Event('change', { bubbles: true }));\n    return { status: 'ok', value: options[index].value };\n}";

async fn perform_select<C>(
    cdp: &C,
    page: PageId,
    object_id: &str,
    method: SelectMethod,
    item: &str,
) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let value = match method {
        SelectMethod::Text => {
            cdp.call_function_on(page, object_id, SELECT_BY_TEXT_OR_VALUE_FN, vec![json!("text"), json!(item)])
                .await?
        }
        SelectMethod::Value => {
            cdp.call_function_on(page, object_id, SELECT_BY_TEXT_OR_VALUE_FN, vec![json!("value"), json!(item)])
                .await?
        }
        SelectMethod::Index => {
            let idx: usize = item
                .parse()
                .map_err(|_| InteractError::OptionNotFound(format!("invalid index: {item}")))?;
            cdp.call_function_on(page, object_id, SELECT_BY_INDEX_FN, vec![json!(idx)]).await?
        }
    };

    match value.get("status").and_then(Value::as_str).unwrap_or("unknown") {
        "ok" => Ok(()),
        "not-found" => Err(InteractError::OptionNotFound(item.to_string())),
        "out-of-range" => Err(InteractError::OptionNotFound(format!("index {item} out of range"))),
        other => Err(InteractError::internal(format!("unexpected select status: {other}"))),
    }
}

async fn capture_post_signals<C>(interactor: &DefaultElementInteractor<C>, ctx: &ExecCtx) -> PostSignals
where
    C: Cdp + Send + Sync,
{
    match interactor.capture_page_signals(ctx.page).await {
        Ok(signals) => signals,
        Err(err) => {
            warn!(%err, "failed to capture select signals");
            PostSignals::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_method_defaults_to_value() {
        assert_eq!(SelectMethod::default(), SelectMethod::Value);
    }

    #[test]
    fn index_parsing_rejects_non_numeric_and_negative() {
        assert!("0".parse::<usize>().is_ok());
        assert!("invalid".parse::<usize>().is_err());
        assert!("-1".parse::<usize>().is_err());
    }
}
