//! `search`, `navigate`, `go_back`, `wait` — the four actions that move the
//! active tab around without touching a specific element.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use url::form_urlencoded;
use wayfarer_actions::{ActionCtx, ActionHandler};
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, WayfarerError};

use super::{required_str, resolve_target_for_page, ActionDeps};

/// Builds a DuckDuckGo results URL for a query, matching the teacher's
/// default-engine choice (fewer captchas than Google/Bing for an automated
/// client) and its `form_urlencoded` query-encoding approach.
fn search_url(query: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://duckduckgo.com/?q={encoded}")
}

pub struct SearchHandler {
    deps: Arc<ActionDeps>,
}

impl SearchHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for SearchHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let query = required_str(params, "query")?;
        let url = search_url(query);
        let target = resolve_target_for_page(&self.deps, ctx.page)?;
        let deadline = ctx.deadline.saturating_duration_since(Instant::now());
        self.deps.targets.navigate(target, &url, false, deadline).await?;
        Ok(ActionResult::ok(format!("Searched for \"{query}\" and loaded the results page.")))
    }
}

pub struct NavigateHandler {
    deps: Arc<ActionDeps>,
}

impl NavigateHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for NavigateHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let url = required_str(params, "url")?;
        let target = resolve_target_for_page(&self.deps, ctx.page)?;
        let deadline = ctx.deadline.saturating_duration_since(Instant::now());
        self.deps.targets.navigate(target, url, false, deadline).await?;
        Ok(ActionResult::ok(format!("Navigated to {url}.")))
    }
}

pub struct GoBackHandler {
    deps: Arc<ActionDeps>,
}

impl GoBackHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for GoBackHandler {
    async fn execute(&self, ctx: &ActionCtx, _params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let target = resolve_target_for_page(&self.deps, ctx.page)?;
        self.deps.targets.go_back(target).await?;
        Ok(ActionResult::ok("Navigated back in tab history."))
    }
}

const DEFAULT_WAIT_MS: u64 = 1_000;

pub struct WaitHandler;

#[async_trait]
impl ActionHandler for WaitHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let ms = params.get("ms").and_then(ParamValue::as_u64).unwrap_or(DEFAULT_WAIT_MS);
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        Ok(ActionResult::ok(format!("Waited {ms}ms.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_spaces_and_symbols() {
        let url = search_url("rust async/await");
        assert_eq!(url, "https://duckduckgo.com/?q=rust+async%2Fawait");
    }
}
