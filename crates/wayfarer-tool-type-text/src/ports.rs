use async_trait::async_trait;
use wayfarer_cdp::PageId;
use wayfarer_core::{ActionId, BackendNodeId, WayfarerError};

use crate::model::{DomDigest, InputMode, NetDigest, PostSignals, ValueDigest};

/// Low-level CDP operations the runner needs outside of the actual text
/// entry, which is delegated to `wayfarer_interact_primitives::ElementInteractor`.
#[async_trait]
pub trait CdpPort: Send + Sync {
    async fn scroll_into_view(&self, page: PageId, node: BackendNodeId) -> Result<(), WayfarerError>;
    async fn focus(&self, page: PageId, node: BackendNodeId) -> Result<(), WayfarerError>;
    async fn wait_dom_ready(&self, page: PageId, deadline: std::time::Instant) -> Result<(), WayfarerError>;
    async fn current_url(&self, page: PageId) -> Result<String, WayfarerError>;
    async fn current_title(&self, page: PageId) -> Result<String, WayfarerError>;
}

#[async_trait]
pub trait StructPort: Send + Sync {
    async fn is_visible(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn is_clickable(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn is_enabled(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn field_meta(&self, page: PageId, node: BackendNodeId) -> Result<FieldMeta, WayfarerError>;
    async fn local_diff(&self, page: PageId, node: BackendNodeId) -> Result<DomDigest, WayfarerError>;
}

#[async_trait]
pub trait NetworkPort: Send + Sync {
    async fn window_digest(&self, page: PageId) -> Result<NetDigest, WayfarerError>;
    async fn value_digest(&self, page: PageId, node: BackendNodeId) -> Result<ValueDigest, WayfarerError>;
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
    fn record_mode(&self, mode: &str);
}

/// Builds and runs a humanized typing cadence. Only `InputMode::Natural`
/// produces a non-empty plan; other modes type at the interactor's default
/// pace.
#[async_trait]
pub trait TempoPort: Send + Sync {
    async fn build_plan(&self, mode: InputMode, text: &str) -> Result<TypingPlan, WayfarerError>;
    async fn run_plan(&self, page: PageId, plan: &TypingPlan) -> Result<(), WayfarerError>;
}

#[derive(Clone, Debug, Default)]
pub struct TypingPlan {
    pub steps: Vec<TypingStep>,
}

#[derive(Clone, Debug)]
pub struct TypingStep {
    pub chunk: String,
    pub delay_ms: u64,
}

#[derive(Clone, Debug, Default)]
pub struct FieldMeta {
    pub readonly: bool,
    pub maxlength: Option<u32>,
    pub password_like: bool,
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
    pub readonly: bool,
}
