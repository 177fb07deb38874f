use std::time::Instant;

use async_trait::async_trait;
use wayfarer_cdp::PageId;
use wayfarer_core::{ActionId, BackendNodeId, WayfarerError};

use crate::model::{DomDigest, MouseBtn, NetDigest, PostSignals};

/// Low-level CDP operations the runner needs outside of the actual click
/// dispatch, which is delegated to `wayfarer_interact_primitives::ElementInteractor`.
#[async_trait]
pub trait CdpPort: Send + Sync {
    async fn scroll_into_view(&self, page: PageId, node: BackendNodeId) -> Result<(), WayfarerError>;
    async fn focus(&self, page: PageId, node: BackendNodeId) -> Result<(), WayfarerError>;
    async fn wait_dom_ready(&self, page: PageId, deadline: Instant) -> Result<(), WayfarerError>;
    async fn current_url(&self, page: PageId) -> Result<String, WayfarerError>;
    async fn current_title(&self, page: PageId) -> Result<String, WayfarerError>;
}

#[async_trait]
pub trait StructPort: Send + Sync {
    async fn is_visible(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn is_clickable(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn is_enabled(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn local_diff(&self, page: PageId, node: BackendNodeId) -> Result<DomDigest, WayfarerError>;
}

#[async_trait]
pub trait NetworkPort: Send + Sync {
    async fn window_digest(&self, page: PageId) -> Result<NetDigest, WayfarerError>;
}

/// Finds an alternative backend-node-id when the primary target fails
/// precheck, by re-running selector-map resolution.
#[async_trait]
pub trait LocatorPort: Send + Sync {
    async fn try_once(&self, request: HealRequest) -> Result<HealOutcome, WayfarerError>;
}

#[async_trait]
pub trait EventsPort: Send + Sync {
    async fn emit_started(&self, action: &ActionId, node: BackendNodeId);
    async fn emit_precheck(&self, action: &ActionId, precheck: &PrecheckEvent);
    async fn emit_finished(&self, action: &ActionId, report: &PostSignals, ok: bool, error: Option<&WayfarerError>);
}

#[async_trait]
pub trait MetricsPort: Send + Sync {
    fn record_ok(&self, latency_ms: u128);
    fn record_fail(&self, kind: &str);
    fn record_precheck_failure(&self, field: &str);
    fn record_self_heal(&self, success: bool);
}

/// Humanized pre-click timing, a no-op unless stealth mode is configured.
#[async_trait]
pub trait TempoPort: Send + Sync {
    async fn prepare(&self, page: PageId, node: BackendNodeId) -> Result<TempoPlan, WayfarerError>;
    async fn apply(&self, plan: &TempoPlan) -> Result<(), WayfarerError>;
}

#[derive(Clone, Debug)]
pub struct HealRequest {
    pub action_id: ActionId,
    pub page: PageId,
    pub primary: BackendNodeId,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct HealOutcome {
    pub used_node: Option<BackendNodeId>,
}

#[derive(Clone, Debug, Default)]
pub struct PrecheckEvent {
    pub visible: bool,
    pub clickable: bool,
    pub enabled: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TempoPlan {
    pub hover_ms: u64,
    pub dwell_ms: u64,
}
