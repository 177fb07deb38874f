//! `done` is intercepted by the agent loop before it ever reaches the
//! registry, but `build_registry` still requires every catalog name mapped
//! to a handler, and a directly dispatched registry (replay, tests) can
//! still hit this one.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use wayfarer_actions::{ActionCtx, ActionHandler};
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, WayfarerError};

use super::{optional_bool, required_str};

pub struct DoneHandler;

impl DoneHandler {
    pub fn shared() -> Arc<dyn ActionHandler> {
        Arc::new(Self)
    }
}

#[async_trait]
impl ActionHandler for DoneHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let text = required_str(params, "text")?;
        let success = optional_bool(params, "success");
        Ok(ActionResult::done(success, text))
    }
}
