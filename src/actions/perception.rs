//! `find_text`, `screenshot`, `evaluate`, `extract` — actions that read the
//! page rather than act on it. None of these need a resolved `TargetId`;
//! they all operate directly on `ctx.page`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use wayfarer_actions::{ActionCtx, ActionHandler};
use wayfarer_cdp::Cdp;
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, WayfarerError};
use wayfarer_snapshot_visual::ScreenshotOptions;

use super::{optional_bool, required_str, ActionDeps};

/// Pulls the page's visible text the same way the reference extractor does:
/// title, `document.body.innerText` collapsed to single spaces, capped so a
/// model's context doesn't drown in one page dump.
const READ_PAGE_SCRIPT: &str = "(() => { const title = document.title || ''; const text = (document.body && document.body.innerText) || ''; return { url: window.location.href || '', title, text: text.replace(/\\s+/g, ' ').slice(0, 4000) }; })()";

pub struct FindTextHandler {
    deps: Arc<ActionDeps>,
}

impl FindTextHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for FindTextHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let needle = required_str(params, "text")?;
        let value = self.deps.cdp.evaluate_script(ctx.page, READ_PAGE_SCRIPT).await?;
        let page_text = value.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        let found = page_text.to_lowercase().contains(&needle.to_lowercase());

        if found {
            let pos = page_text.to_lowercase().find(&needle.to_lowercase()).unwrap_or(0);
            let start = pos.saturating_sub(80);
            let end = (pos + needle.len() + 80).min(page_text.len());
            let context = &page_text[start..end];
            Ok(ActionResult::ok(format!("Found \"{needle}\" on the page: ...{context}...")))
        } else {
            Ok(ActionResult::ok(format!("\"{needle}\" was not found on the visible page.")))
        }
    }
}

pub struct ScreenshotHandler {
    deps: Arc<ActionDeps>,
}

impl ScreenshotHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for ScreenshotHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let full_page = optional_bool(params, "full_page");
        let mut options = ScreenshotOptions::default();
        if full_page {
            options.capture_mode = wayfarer_snapshot_visual::CaptureMode::FullPage;
        }

        let screenshot = self.deps.screenshots.capture(ctx.page, options).await?;
        let encoded = BASE64.encode(&screenshot.data);

        Ok(ActionResult {
            extracted_content: Some(encoded),
            long_term_memory: Some(format!("Captured a {}x{} screenshot.", screenshot.width, screenshot.height)),
            include_in_memory: true,
            ..Default::default()
        })
    }
}

pub struct EvaluateHandler {
    deps: Arc<ActionDeps>,
}

impl EvaluateHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for EvaluateHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let expression = required_str(params, "expression")?;
        let value = self.deps.cdp.evaluate_script(ctx.page, expression).await?;
        let rendered = serde_json::to_string(&value).unwrap_or_else(|_| value.to_string());
        Ok(ActionResult {
            extracted_content: Some(rendered.clone()),
            long_term_memory: Some(format!("Evaluated `{expression}` => {rendered}")),
            include_in_memory: true,
            ..Default::default()
        })
    }
}

pub struct ExtractHandler {
    deps: Arc<ActionDeps>,
}

impl ExtractHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for ExtractHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let goal = required_str(params, "goal")?;
        let value = self.deps.cdp.evaluate_script(ctx.page, READ_PAGE_SCRIPT).await?;
        let text = value.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        let title = value.get("title").and_then(|v| v.as_str()).unwrap_or_default();

        Ok(ActionResult {
            extracted_content: Some(text.to_string()),
            long_term_memory: Some(format!("Extracted page content for \"{goal}\" from \"{title}\".")),
            include_in_memory: true,
            ..Default::default()
        })
    }
}
