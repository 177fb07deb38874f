use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wayfarer_cdp::PageId;
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, TaskId, WayfarerError};

/// Execution context threaded through every handler invocation: which task
/// and page an action belongs to, its deadline, and the loop's cancellation
/// token.
#[derive(Clone, Debug)]
pub struct ActionCtx {
    pub task_id: TaskId,
    pub page: PageId,
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl ActionCtx {
    pub fn new(task_id: TaskId, page: PageId, deadline: Instant, cancel: CancellationToken) -> Self {
        Self { task_id, page, deadline, cancel }
    }
}

/// One action type's implementation. The registry validates parameters
/// against the action's manifest before a handler ever sees them, so
/// handlers only need to interpret already-well-formed values.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError>;
}
