//! Wait primitive: explicit waits for element visibility, URL/title
//! matching, fixed duration, and network idle.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use wayfarer_cdp::{Cdp, WaitGate};
use wayfarer_core::BackendNodeId;

use crate::primitives::DefaultElementInteractor;
use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, WaitCondition},
};

const POLL_INTERVAL_MS: u64 = 100;

pub async fn execute_wait<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    condition: &WaitCondition,
    timeout_ms: u64,
) -> Result<ActionReport, InteractError>
where
    C: Cdp + Send + Sync,
{
    let started_at = Utc::now();
    let start_instant = std::time::Instant::now();

    info!(
        action_id = %ctx.action_id,
        condition = ?condition,
        timeout_ms,
        "executing wait primitive"
    );

    if ctx.is_cancelled() {
        return Err(InteractError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(InteractError::Timeout("context deadline exceeded".to_string()));
    }

    let timeout_duration = Duration::from_millis(timeout_ms);

    match timeout(timeout_duration, wait_for_condition(interactor, ctx, condition)).await {
        Ok(Ok(())) => debug!("wait condition met successfully"),
        Ok(Err(err)) => {
            warn!(%err, "wait condition check failed");
            return Err(err);
        }
        Err(_) => {
            warn!(timeout_ms, "wait timed out");
            return Err(InteractError::Timeout(format!("condition not met after {timeout_ms}ms: {condition:?}")));
        }
    }

    let post_signals = capture_post_signals(interactor, ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(action_id = %ctx.action_id, latency_ms, "wait completed successfully");
    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

async fn wait_for_condition<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    condition: &WaitCondition,
) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let cdp = interactor.cdp();
    match condition {
        WaitCondition::ElementVisible(backend_node_id) => {
            wait_for_visibility(cdp, ctx, *backend_node_id, true).await
        }
        WaitCondition::ElementHidden(backend_node_id) => {
            wait_for_visibility(cdp, ctx, *backend_node_id, false).await
        }
        WaitCondition::UrlMatches(pattern) => wait_property_matches(cdp, ctx, pattern, "window.location.href || ''").await,
        WaitCondition::UrlEquals(expected) => wait_property_equals(cdp, ctx, expected, "window.location.href || ''").await,
        WaitCondition::TitleMatches(pattern) => wait_property_matches(cdp, ctx, pattern, "document.title || ''").await,
        WaitCondition::Duration(ms) => wait_duration(*ms).await,
        WaitCondition::NetworkIdle(quiet_ms) => wait_network_idle(cdp, ctx, *quiet_ms).await,
    }
}

const VISIBILITY_FN: &str = "function() {\n    const style = window.getComputedStyle(this);\n    const rect = this.getBoundingClientRect();\n    return style.visibility !== 'hidden' && style.display !== 'none' && (rect.width > 0 || rect.height > 0 || this.getClientRects().length > 0);\n}";

async fn wait_for_visibility<C>(
    cdp: &C,
    ctx: &ExecCtx,
    backend_node_id: BackendNodeId,
    expect_visible: bool,
) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    loop {
        if ctx.is_cancelled() {
            return Err(InteractError::Interrupted("context cancelled".to_string()));
        }
        if ctx.is_timeout() {
            return Err(InteractError::Timeout("context deadline exceeded while waiting for visibility".to_string()));
        }

        let resolved = cdp.resolve_backend_node(ctx.page, backend_node_id).await;
        let visible = match resolved {
            Ok(object_id) => cdp
                .call_function_on(ctx.page, &object_id, VISIBILITY_FN, Vec::new())
                .await
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Err(_) => false,
        };

        if expect_visible == visible {
            return Ok(());
        }

        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

async fn wait_duration(ms: u64) -> Result<(), InteractError> {
    debug!(ms, "waiting for fixed duration");
    sleep(Duration::from_millis(ms)).await;
    Ok(())
}

async fn wait_network_idle<C>(cdp: &C, ctx: &ExecCtx, quiet_ms: u64) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    debug!(quiet_ms, "waiting for network idle");
    let window_ms = quiet_ms.max(1);
    let gate_json = serde_json::to_string(&WaitGate::NetworkQuiet { window_ms, max_inflight: 0 })
        .map_err(|err| InteractError::internal(format!("failed to encode wait gate: {err}")))?;

    cdp.wait_basic(ctx.page, gate_json, ctx.remaining_time()).await.map_err(InteractError::from)
}

async fn wait_property_matches<C>(cdp: &C, ctx: &ExecCtx, pattern: &str, fetch_expr: &str) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let pattern_literal = serde_json::to_string(pattern)
        .map_err(|err| InteractError::internal(format!("invalid pattern encoding: {err}")))?;

    let expression = format!(
        "(() => {{\n            const value = {fetch_expr};\n            const pattern = {pattern_literal};\n            let matches = false;\n            try {{\n                const regex = new RegExp(pattern);\n                matches = regex.test(value);\n            }} catch (err) {{\n                matches = value.includes(pattern);\n            }}\n            return {{ matches, value }};\n        }})()"
    );

    poll_expression(cdp, ctx, &expression).await
}

async fn wait_property_equals<C>(cdp: &C, ctx: &ExecCtx, expected: &str, fetch_expr: &str) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    let expected_literal = serde_json::to_string(expected)
        .map_err(|err| InteractError::internal(format!("invalid literal encoding: {err}")))?;

    let expression = format!(
        "(() => {{\n            const value = {fetch_expr};\n            const expected = {expected_literal};\n            return {{ matches: value === expected, value }};\n        }})()"
    );

    poll_expression(cdp, ctx, &expression).await
}

async fn poll_expression<C>(cdp: &C, ctx: &ExecCtx, expression: &str) -> Result<(), InteractError>
where
    C: Cdp + Send + Sync,
{
    loop {
        if ctx.is_cancelled() {
            return Err(InteractError::Interrupted("context cancelled".to_string()));
        }
        if ctx.is_timeout() {
            return Err(InteractError::Timeout("context deadline exceeded while polling".to_string()));
        }

        let result = cdp.evaluate_script(ctx.page, expression).await?;
        if result.get("matches").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(());
        }

        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

async fn capture_post_signals<C>(interactor: &DefaultElementInteractor<C>, ctx: &ExecCtx) -> PostSignals
where
    C: Cdp + Send + Sync,
{
    match interactor.capture_page_signals(ctx.page).await {
        Ok(signals) => signals,
        Err(err) => {
            warn!(%err, "failed to capture wait signals");
            PostSignals::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_duration_waits_approximately_the_requested_time() {
        let start = std::time::Instant::now();
        wait_duration(100).await.unwrap();
        let elapsed = start.elapsed().as_millis();
        assert!(elapsed >= 100);
        assert!(elapsed < 200);
    }

    #[test]
    fn wait_condition_variants_construct() {
        use wayfarer_core::BackendNodeId;

        let _ = WaitCondition::Duration(1000);
        let _ = WaitCondition::NetworkIdle(500);
        let _ = WaitCondition::UrlMatches("example.com".to_string());
        let _ = WaitCondition::UrlEquals("https://example.com".to_string());
        let _ = WaitCondition::TitleMatches("Home".to_string());
        let _ = WaitCondition::ElementVisible(BackendNodeId(1));
        let _ = WaitCondition::ElementHidden(BackendNodeId(2));
    }
}
