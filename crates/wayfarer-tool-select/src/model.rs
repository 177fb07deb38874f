use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use wayfarer_cdp::PageId;
use wayfarer_core::{ActionId, BackendNodeId, WayfarerError};

#[derive(Clone, Debug)]
pub struct ExecCtx {
    pub action_id: ActionId,
    pub page: PageId,
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl ExecCtx {
    pub fn new(action_id: ActionId, page: PageId, deadline: Instant, cancel: CancellationToken) -> Self {
        Self { action_id, page, deadline, cancel }
    }
}

/// How `item` is interpreted. There is no anchor-addressed option match at
/// this layer — `ElementInteractor::select` only resolves options by text,
/// value, or index, so the teacher's `Anchor` variant has no counterpart
/// here and is dropped.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MatchKind {
    Value,
    Label,
    Index,
}

impl Default for MatchKind {
    fn default() -> Self {
        MatchKind::Value
    }
}

impl MatchKind {
    pub fn to_select_method(self) -> wayfarer_interact_primitives::SelectMethod {
        match self {
            MatchKind::Value => wayfarer_interact_primitives::SelectMethod::Value,
            MatchKind::Label => wayfarer_interact_primitives::SelectMethod::Text,
            MatchKind::Index => wayfarer_interact_primitives::SelectMethod::Index,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SelectMode {
    Single,
    Multiple,
    Toggle,
}

impl Default for SelectMode {
    fn default() -> Self {
        SelectMode::Single
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum WaitTier {
    Auto,
    DomReady,
    None,
}

impl Default for WaitTier {
    fn default() -> Self {
        WaitTier::Auto
    }
}

/// Parameters for a selection, addressed directly at a resolved
/// backend-node-id. `item` is a single value for `SelectMode::Single`/
/// `Toggle`, or a comma-separated list of values for `SelectMode::Multiple`
/// — `ElementInteractor::select` resolves one option per call, so multiple
/// mode is driven as one call per listed value.
#[derive(Clone, Debug)]
pub struct SelectParams {
    pub backend_node_id: BackendNodeId,
    pub match_kind: MatchKind,
    pub item: String,
    pub mode: SelectMode,
}

impl SelectParams {
    pub fn new(backend_node_id: BackendNodeId, item: String) -> Self {
        Self { backend_node_id, match_kind: MatchKind::Value, item, mode: SelectMode::Single }
    }

    pub fn items(&self) -> Vec<String> {
        match self.mode {
            SelectMode::Multiple => self.item.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            SelectMode::Single | SelectMode::Toggle => vec![self.item.clone()],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SelectOpt {
    pub wait: WaitTier,
    pub timeout_ms: Option<u64>,
    pub priority: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct ActionReport {
    pub ok: bool,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency_ms: u128,
    pub precheck: Option<FieldSnapshot>,
    pub post_signals: PostSignals,
    pub self_heal: Option<SelfHeal>,
    pub error: Option<WayfarerError>,
}

impl ActionReport {
    pub fn new(started_at: Instant) -> Self {
        Self {
            ok: false,
            started_at,
            finished_at: started_at,
            latency_ms: 0,
            precheck: None,
            post_signals: PostSignals::default(),
            self_heal: None,
            error: None,
        }
    }

    pub fn finish(mut self, finished_at: Instant) -> Self {
        self.finished_at = finished_at;
        self.latency_ms = finished_at.saturating_duration_since(self.started_at).as_millis();
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct FieldSnapshot {
    pub visible: bool,
    pub clickable: bool,
    pub enabled: bool,
    pub readonly: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SelfHeal {
    pub attempted: bool,
    pub reason: Option<String>,
    pub used_node: Option<BackendNodeId>,
}

#[derive(Clone, Debug, Default)]
pub struct PostSignals {
    pub dom: DomDigest,
    pub net: NetDigest,
    pub selection: SelectionDigest,
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DomDigest {
    pub changed_nodes: u32,
    pub focus_changed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct NetDigest {
    pub res2xx: u32,
    pub redirects: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionDigest {
    pub changed: bool,
    pub selected_count: usize,
    pub selected_indices: Vec<u32>,
    pub selected_hash: Option<String>,
}

pub fn remaining_deadline(ctx: &ExecCtx) -> Duration {
    ctx.deadline
        .checked_duration_since(Instant::now())
        .unwrap_or_else(|| Duration::from_secs(0))
}
