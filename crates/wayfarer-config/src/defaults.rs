use crate::model::{
    ActionTimeouts, AgentLimits, AgentPolicy, ConfigSnapshot, FeatureFlags, RetryPolicy,
    SnapshotPolicies, StructuralCachePolicy, StructuralDiffPolicy, StructuralJudgePolicy,
    StructuralPerceiverPolicy, StructuralResolvePolicy, StructuralScoreWeights, TargetsPolicy,
};

pub fn default_snapshot() -> ConfigSnapshot {
    ConfigSnapshot {
        rev: 1,
        agent: AgentPolicy {
            limits: AgentLimits {
                max_actions_per_step: 10,
                max_steps: 100,
                max_duration_secs: 1_800,
            },
            timeouts_ms: ActionTimeouts {
                navigate: 15_000,
                click: 5_000,
                type_text: 5_000,
                wait: 10_000,
                screenshot: 10_000,
            },
            retry: RetryPolicy {
                max_attempts: 1,
                backoff_ms: 300,
            },
        },
        targets: TargetsPolicy {
            health_probe_interval_ms: 5_000,
            allow_multiple_targets: true,
        },
        features: FeatureFlags {
            metrics_export: false,
            vision_enabled: false,
            anti_oscillation_guard: true,
            watchdogs_enabled: true,
        },
        snapshot: SnapshotPolicies {
            structural: StructuralPerceiverPolicy {
                resolve: StructuralResolvePolicy {
                    max_candidates: 1,
                    fuzziness: None,
                    debounce_ms: Some(250),
                },
                weights: StructuralScoreWeights {
                    visibility: 0.05,
                    accessibility: 0.06,
                    text: 0.05,
                    geometry: 0.1,
                    backend: 0.25,
                },
                judge: StructuralJudgePolicy {
                    minimum_opacity: None,
                    minimum_visible_area: None,
                    pointer_events_block: true,
                },
                diff: StructuralDiffPolicy {
                    debounce_ms: None,
                    max_changes: None,
                    focus: None,
                },
                cache: StructuralCachePolicy {
                    anchor_ttl_ms: 250,
                    snapshot_ttl_ms: 1_000,
                },
            },
        },
        provenance: Default::default(),
    }
}
