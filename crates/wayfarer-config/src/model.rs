//! The configuration snapshot: one immutable value the rest of the runtime
//! reads from, rebuilt whenever a file, environment variable, or runtime
//! override changes it. Each leaf field's current value is tagged with its
//! [`ConfigSource`] in `provenance` so `wayfarer config show` can explain
//! where a number came from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ConfigSnapshot {
    pub rev: u64,
    pub agent: AgentPolicy,
    pub targets: TargetsPolicy,
    pub features: FeatureFlags,
    #[serde(default)]
    pub snapshot: SnapshotPolicies,
    pub provenance: HashMap<String, ConfigProvenance>,
}

/// Knobs for the agent loop (spec §4.I): how many actions it may dispatch per
/// model turn, how long it may run, and how it retries a failed primitive.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AgentPolicy {
    pub limits: AgentLimits,
    pub timeouts_ms: ActionTimeouts,
    pub retry: RetryPolicy,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AgentLimits {
    pub max_actions_per_step: usize,
    pub max_steps: usize,
    pub max_duration_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ActionTimeouts {
    pub navigate: u64,
    pub click: u64,
    pub type_text: u64,
    pub wait: u64,
    pub screenshot: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub backoff_ms: u64,
}

/// Knobs for the session/target manager (spec §4.B).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TargetsPolicy {
    pub health_probe_interval_ms: u64,
    pub allow_multiple_targets: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct FeatureFlags {
    pub metrics_export: bool,
    pub vision_enabled: bool,
    pub anti_oscillation_guard: bool,
    pub watchdogs_enabled: bool,
}

/// Knobs for DOM perception: the snapshot collector, the interactive-element
/// serialiser, and the locator resolver (spec §4.C, §4.D, §4.K).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SnapshotPolicies {
    pub structural: StructuralPerceiverPolicy,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralPerceiverPolicy {
    pub resolve: StructuralResolvePolicy,
    pub weights: StructuralScoreWeights,
    pub judge: StructuralJudgePolicy,
    pub diff: StructuralDiffPolicy,
    pub cache: StructuralCachePolicy,
}

/// Locator resolver candidate search (spec §4.K).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralResolvePolicy {
    pub max_candidates: usize,
    pub fuzziness: Option<f32>,
    pub debounce_ms: Option<u64>,
}

/// Weights the locator resolver uses to rank candidates against a
/// previously-seen element description.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralScoreWeights {
    pub visibility: f32,
    pub accessibility: f32,
    pub text: f32,
    pub geometry: f32,
    pub backend: f32,
}

/// Thresholds the interactive-element serialiser uses to classify a node as
/// interactive (spec §4.D step 2).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralJudgePolicy {
    pub minimum_opacity: Option<f32>,
    pub minimum_visible_area: Option<f64>,
    pub pointer_events_block: bool,
}

/// DOM-mutation debounce feeding the event bus's throttle watchdog (spec
/// §4.G).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralDiffPolicy {
    pub debounce_ms: Option<u64>,
    pub max_changes: Option<usize>,
    pub focus: Option<StructuralDiffFocus>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralDiffFocus {
    pub backend_node_id: Option<u64>,
    pub geometry: Option<StructuralDiffGeometry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralDiffGeometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// TTLs the snapshot hub uses to cache anchors/snapshots between steps.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StructuralCachePolicy {
    pub anchor_ttl_ms: u64,
    pub snapshot_ttl_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigProvenance {
    pub path: String,
    pub source: ConfigSource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigSource {
    Builtin,
    File,
    Env,
    Cli,
    RuntimeOverride,
}

#[derive(Clone, Debug)]
pub struct ConfigView {
    pub rev: u64,
    pub agent: AgentPolicy,
    pub targets: TargetsPolicy,
    pub features: FeatureFlags,
    pub snapshot: SnapshotPolicies,
}

impl From<ConfigSnapshot> for ConfigView {
    fn from(snapshot: ConfigSnapshot) -> Self {
        Self {
            rev: snapshot.rev,
            agent: snapshot.agent,
            targets: snapshot.targets,
            features: snapshot.features,
            snapshot: snapshot.snapshot,
        }
    }
}

impl ConfigSnapshot {
    pub fn set_provenance(&mut self, path: &str, source: ConfigSource) {
        self.provenance.insert(
            path.to_string(),
            ConfigProvenance {
                path: path.to_string(),
                source,
            },
        );
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeOverrideSpec {
    pub path: String,
    pub value: serde_json::Value,
    pub owner: String,
    pub reason: String,
    pub ttl_seconds: u64,
}
