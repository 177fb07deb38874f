use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use wayfarer_cdp::PageId;
use wayfarer_core::{ActionId, BackendNodeId, WayfarerError};

/// Execution context delivered by the scheduler when invoking the tool.
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

/// Controls how text is injected. `Instant` and `Paste` both collapse onto
/// the same character-by-character dispatch as `Character` — there is no
/// direct-value-set or clipboard-paste CDP primitive at the backend-node-id
/// layer, only the synthetic key-event path `ElementInteractor::fill` drives.
/// `Natural` is the one mode that still does something different: it runs a
/// tempo plan before typing begins.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum InputMode {
    Character,
    Instant,
    Natural,
    Paste,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::Character
    }
}

/// Parameters describing the intended text entry, addressed directly at a
/// resolved backend-node-id.
#[derive(Clone, Debug)]
pub struct TextParams {
    pub backend_node_id: BackendNodeId,
    pub text: String,
    pub mode: InputMode,
    pub clear: ClearConfig,
    pub submit: bool,
}

impl TextParams {
    pub fn new(backend_node_id: BackendNodeId, text: String) -> Self {
        Self {
            backend_node_id,
            text,
            mode: InputMode::Character,
            clear: ClearConfig::default(),
            submit: false,
        }
    }
}

/// Whether to clear the field before typing. `ElementInteractor::fill`
/// already runs its own clear-via-script/clear-via-keys fallback chain, so
/// unlike the teacher there is no separate select-all-vs-backspace method to
/// pick between here.
#[derive(Clone, Debug)]
pub struct ClearConfig {
    pub enabled: bool,
}

impl Default for ClearConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Desired waiting behaviour post input.
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

/// Optional runtime tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct TextOpt {
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
    pub maxlength: Option<u32>,
    pub password_like: bool,
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
    pub value: ValueDigest,
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
pub struct ValueDigest {
    pub changed: bool,
    pub old_len: Option<usize>,
    pub new_len: Option<usize>,
    pub hash_after: Option<String>,
}

pub fn remaining_deadline(ctx: &ExecCtx) -> Duration {
    ctx.deadline
        .checked_duration_since(Instant::now())
        .unwrap_or_else(|| Duration::from_secs(0))
}
