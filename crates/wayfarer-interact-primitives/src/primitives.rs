//! Element interaction primitives.
//!
//! Six primitives addressed directly at a resolved `BackendNodeId`:
//! 1. navigate - navigate to a URL with built-in waiting
//! 2. click - click an element, falling back through geometry strategies
//! 3. fill - focus and type into an input field
//! 4. select - select from a dropdown/listbox
//! 5. scroll - scroll the page or an element into view
//! 6. wait - explicit waits for various conditions

mod click;
mod fill;
mod navigate;
mod scroll;
mod select;
mod wait;

pub use click::*;
pub use fill::*;
pub use navigate::*;
pub use scroll::*;
pub use select::*;
pub use wait::*;

use std::sync::Arc;

use async_trait::async_trait;
use wayfarer_cdp::{Cdp, PageId};
use wayfarer_core::BackendNodeId;

use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, ScrollBehavior, ScrollTarget, SelectMethod, WaitCondition, WaitTier},
    waiting::WaitStrategy,
};

/// Interface every element-interaction primitive implements.
#[async_trait]
pub trait ElementInteractor: Send + Sync {
    async fn navigate(&self, ctx: &ExecCtx, url: &str, wait_tier: WaitTier) -> Result<ActionReport, InteractError>;

    async fn click(&self, ctx: &ExecCtx, backend_node_id: BackendNodeId, wait_tier: WaitTier) -> Result<ActionReport, InteractError>;

    async fn fill(
        &self,
        ctx: &ExecCtx,
        backend_node_id: BackendNodeId,
        value: &str,
        clear: bool,
        submit: bool,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, InteractError>;

    async fn select(
        &self,
        ctx: &ExecCtx,
        backend_node_id: BackendNodeId,
        method: SelectMethod,
        item: &str,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, InteractError>;

    async fn scroll(&self, ctx: &ExecCtx, target: &ScrollTarget, behavior: ScrollBehavior) -> Result<ActionReport, InteractError>;

    async fn wait_for(&self, ctx: &ExecCtx, condition: &WaitCondition, timeout_ms: u64) -> Result<ActionReport, InteractError>;
}

/// Default implementation of element interaction, driven by any `Cdp`
/// implementor.
pub struct DefaultElementInteractor<C>
where
    C: Cdp + Send + Sync,
{
    cdp: Arc<C>,
    wait_strategy: Arc<dyn WaitStrategy>,
}

impl<C> DefaultElementInteractor<C>
where
    C: Cdp + Send + Sync,
{
    pub fn new(cdp: Arc<C>, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self { cdp, wait_strategy }
    }

    pub fn cdp(&self) -> &C {
        &self.cdp
    }

    pub fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.wait_strategy
    }

    /// Captures URL/title signals for observability; never fails an action.
    pub async fn capture_page_signals(&self, page: PageId) -> Result<PostSignals, InteractError> {
        let script = "(() => ({ url: window.location.href || null, title: document.title || null }))()";
        let value = self.cdp.evaluate_script(page, script).await?;

        let mut signals = PostSignals::default();
        signals.url_after = value.get("url").and_then(|v| v.as_str()).map(|s| s.to_string());
        signals.title_after = value.get("title").and_then(|v| v.as_str()).map(|s| s.to_string());
        Ok(signals)
    }
}

#[async_trait]
impl<C> ElementInteractor for DefaultElementInteractor<C>
where
    C: Cdp + Send + Sync,
{
    async fn navigate(&self, ctx: &ExecCtx, url: &str, wait_tier: WaitTier) -> Result<ActionReport, InteractError> {
        navigate::execute_navigate(self, ctx, url, wait_tier).await
    }

    async fn click(&self, ctx: &ExecCtx, backend_node_id: BackendNodeId, wait_tier: WaitTier) -> Result<ActionReport, InteractError> {
        click::execute_click(self, ctx, backend_node_id, wait_tier).await
    }

    async fn fill(
        &self,
        ctx: &ExecCtx,
        backend_node_id: BackendNodeId,
        value: &str,
        clear: bool,
        submit: bool,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, InteractError> {
        fill::execute_fill(self, ctx, backend_node_id, value, clear, submit, wait_tier).await
    }

    async fn select(
        &self,
        ctx: &ExecCtx,
        backend_node_id: BackendNodeId,
        method: SelectMethod,
        item: &str,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, InteractError> {
        select::execute_select(self, ctx, backend_node_id, method, item, wait_tier).await
    }

    async fn scroll(&self, ctx: &ExecCtx, target: &ScrollTarget, behavior: ScrollBehavior) -> Result<ActionReport, InteractError> {
        scroll::execute_scroll(self, ctx, target, behavior).await
    }

    async fn wait_for(&self, ctx: &ExecCtx, condition: &WaitCondition, timeout_ms: u64) -> Result<ActionReport, InteractError> {
        wait::execute_wait(self, ctx, condition, timeout_ms).await
    }
}
