//! `switch`, `close` — actions addressed at a tab index rather than an
//! element, resolved through [`super::resolve_target_by_index`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use wayfarer_actions::{ActionCtx, ActionHandler};
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, WayfarerError};

use super::{resolve_target_by_index, resolve_target_for_page, ActionDeps};

pub struct SwitchHandler {
    deps: Arc<ActionDeps>,
}

impl SwitchHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for SwitchHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let index = params
            .get("index")
            .and_then(ParamValue::as_u64)
            .ok_or_else(|| WayfarerError::new(wayfarer_core::ErrorKind::InvalidActionSchema, "missing integer parameter `index`"))? as u32;
        let target = resolve_target_by_index(&self.deps, index)?;
        self.deps.targets.switch_to(target).await?;
        Ok(ActionResult::ok(format!("Switched to tab {index}.")))
    }
}

pub struct CloseHandler {
    deps: Arc<ActionDeps>,
}

impl CloseHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for CloseHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let target = match params.get("index").and_then(ParamValue::as_u64) {
            Some(index) => resolve_target_by_index(&self.deps, index as u32)?,
            None => resolve_target_for_page(&self.deps, ctx.page)?,
        };
        self.deps.targets.close_target(target).await?;
        Ok(ActionResult::ok("Closed the tab."))
    }
}
