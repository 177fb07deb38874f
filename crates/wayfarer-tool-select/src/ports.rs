use async_trait::async_trait;
use wayfarer_cdp::PageId;
use wayfarer_core::{ActionId, BackendNodeId, WayfarerError};

use crate::model::{DomDigest, MatchKind, NetDigest, SelectionDigest};

/// Low-level CDP operations the runner needs outside of the actual option
/// dispatch, which is delegated to `wayfarer_interact_primitives::ElementInteractor`.
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
    async fn is_readonly(&self, page: PageId, node: BackendNodeId) -> Result<bool, WayfarerError>;
    async fn local_diff(&self, page: PageId, node: BackendNodeId) -> Result<DomDigest, WayfarerError>;
    async fn selection_state(&self, page: PageId, node: BackendNodeId) -> Result<SelectionState, WayfarerError>;
}

#[async_trait]
pub trait NetworkPort: Send + Sync {
    async fn window_digest(&self, page: PageId) -> Result<NetDigest, WayfarerError>;
}

#[async_trait]
pub trait LocatorPort: Send + Sync {
    async fn try_once(&self, request: HealRequest) -> Result<HealOutcome, WayfarerError>;
}

#[async_trait]
pub trait EventsPort: Send + Sync {
    async fn emit_started(&self, action: &ActionId, node: BackendNodeId);
    async fn emit_precheck(&self, action: &ActionId, snapshot: &PrecheckEvent);
    async fn emit_finished(&self, action: &ActionId, signals: &PostEventPayload, ok: bool, error: Option<&WayfarerError>);
}

#[async_trait]
pub trait MetricsPort: Send + Sync {
    fn record_ok(&self, latency_ms: u128);
    fn record_fail(&self, kind: &str);
    fn record_precheck_failure(&self, field: &str);
    fn record_self_heal(&self, success: bool);
    fn record_mode(&self, mode: &str);
    fn record_match_kind(&self, kind: &str);
}

#[async_trait]
pub trait TempoPort: Send + Sync {
    async fn plan(&self, page: PageId, node: BackendNodeId, mode: crate::model::SelectMode) -> Result<TempoPlan, WayfarerError>;
    async fn apply(&self, plan: &TempoPlan) -> Result<(), WayfarerError>;
}

#[derive(Clone, Debug, Default)]
pub struct TempoPlan {
    pub pre_delay_ms: u64,
    pub post_delay_ms: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    pub selected_indices: Vec<u32>,
    pub selected_values: Vec<String>,
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

#[derive(Clone, Debug)]
pub struct PostEventPayload {
    pub selection: SelectionDigest,
}

impl PostEventPayload {
    pub fn new(selection: SelectionDigest) -> Self {
        Self { selection }
    }
}

pub fn match_kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Value => "value",
        MatchKind::Label => "label",
        MatchKind::Index => "index",
    }
}
