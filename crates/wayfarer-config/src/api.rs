use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::warn;

use crate::errors::ConfigError;
use crate::model::{ConfigSnapshot, ConfigSource, RuntimeOverrideSpec};
use crate::override_store::RuntimeOverrideStore;

#[async_trait]
pub trait ConfigCenter: Send + Sync {
    async fn snapshot(&self) -> Arc<ConfigSnapshot>;
    async fn reload(&self) -> Result<(), ConfigError>;
    async fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), ConfigError>;
    fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>>;
    async fn guard(&self) -> ConfigGuard;
}

struct ConfigState {
    base: ConfigSnapshot,
    snapshot: ConfigSnapshot,
    overrides: RuntimeOverrideStore,
    rev_counter: u64,
}

impl ConfigState {
    fn new(base: ConfigSnapshot) -> Self {
        let rev_counter = base.rev;
        Self {
            base: base.clone(),
            snapshot: base,
            overrides: RuntimeOverrideStore::default(),
            rev_counter,
        }
    }

    fn apply_active_overrides(&mut self) -> Result<(), ConfigError> {
        let mut new_snapshot = self.base.clone();
        let entries = self.overrides.active_entries();
        for (path, value) in entries {
            apply_override_to_snapshot(&mut new_snapshot, &path, &value, ConfigSource::RuntimeOverride)?;
        }
        self.rev_counter = self.rev_counter.saturating_add(1);
        new_snapshot.rev = self.rev_counter;
        self.snapshot = new_snapshot;
        Ok(())
    }
}

/// A [`ConfigCenter`] backed by an in-memory snapshot plus TTL-bearing
/// runtime overrides, broadcast to subscribers over a `watch` channel. This
/// is the only implementation the runtime ships: there is no remote config
/// service to poll, so there's nothing a second implementation would add.
pub struct InMemoryConfigCenter {
    state: Arc<Mutex<ConfigState>>,
    watch_tx: watch::Sender<Arc<ConfigSnapshot>>,
}

impl InMemoryConfigCenter {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        let state = ConfigState::new(snapshot);
        let current_snapshot = Arc::new(state.snapshot.clone());
        let (watch_tx, _watch_rx) = watch::channel(current_snapshot);
        Self {
            state: Arc::new(Mutex::new(state)),
            watch_tx,
        }
    }
}

#[async_trait]
impl ConfigCenter for InMemoryConfigCenter {
    async fn snapshot(&self) -> Arc<ConfigSnapshot> {
        let guard = self.state.lock().await;
        Arc::new(guard.snapshot.clone())
    }

    async fn reload(&self) -> Result<(), ConfigError> {
        Err(ConfigError::NotImplemented("reload".into()))
    }

    async fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), ConfigError> {
        let ttl = if override_spec.ttl_seconds > 0 {
            Some(Duration::from_secs(override_spec.ttl_seconds))
        } else {
            None
        };
        let mut guard = self.state.lock().await;
        guard
            .overrides
            .insert(override_spec.path.clone(), override_spec.value.clone(), ttl);
        guard.apply_active_overrides()?;
        let snapshot = Arc::new(guard.snapshot.clone());
        drop(guard);

        let _ = self.watch_tx.send(snapshot.clone());

        if let Some(ttl) = ttl {
            let state = Arc::clone(&self.state);
            let watch_tx = self.watch_tx.clone();
            let path = override_spec.path.clone();
            tokio::spawn(async move {
                sleep(ttl).await;
                let mut guard = state.lock().await;
                if guard.overrides.remove(&path) {
                    match guard.apply_active_overrides() {
                        Ok(()) => {
                            let snapshot = Arc::new(guard.snapshot.clone());
                            drop(guard);
                            if watch_tx.send(snapshot).is_err() {
                                warn!("config override expiry broadcast had no listeners");
                            }
                            return;
                        }
                        Err(err) => {
                            warn!("config override expiry recompute failed: {err}");
                        }
                    }
                }
            });
        }

        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.watch_tx.subscribe()
    }

    async fn guard(&self) -> ConfigGuard {
        let snapshot = self.snapshot().await;
        ConfigGuard { snapshot }
    }
}

/// A snapshot pinned for the duration of one agent step, so two primitives
/// dispatched within the same step never observe different config revisions.
#[derive(Clone, Debug)]
pub struct ConfigGuard {
    snapshot: Arc<ConfigSnapshot>,
}

impl ConfigGuard {
    pub fn revision(&self) -> u64 {
        self.snapshot.rev
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.snapshot)
    }
}

pub(crate) fn apply_override_to_snapshot(
    snapshot: &mut ConfigSnapshot,
    path: &str,
    value: &Value,
    source: ConfigSource,
) -> Result<(), ConfigError> {
    let changed = match path {
        "agent.limits.max_actions_per_step" => merge_usize(
            &mut snapshot.agent.limits.max_actions_per_step,
            to_usize(value)?,
            source,
        ),
        "agent.limits.max_steps" => {
            merge_usize(&mut snapshot.agent.limits.max_steps, to_usize(value)?, source)
        }
        "agent.limits.max_duration_secs" => merge_u64(
            &mut snapshot.agent.limits.max_duration_secs,
            to_u64(value)?,
            source,
        ),
        "agent.retry.max_attempts" => {
            merge_u8(&mut snapshot.agent.retry.max_attempts, to_u8(value)?, source)
        }
        "agent.retry.backoff_ms" => {
            merge_u64(&mut snapshot.agent.retry.backoff_ms, to_u64(value)?, source)
        }
        "agent.timeouts_ms.navigate" => {
            merge_u64(&mut snapshot.agent.timeouts_ms.navigate, to_u64(value)?, source)
        }
        "agent.timeouts_ms.click" => merge_u64(&mut snapshot.agent.timeouts_ms.click, to_u64(value)?, source),
        "agent.timeouts_ms.type_text" => {
            merge_u64(&mut snapshot.agent.timeouts_ms.type_text, to_u64(value)?, source)
        }
        "agent.timeouts_ms.wait" => merge_u64(&mut snapshot.agent.timeouts_ms.wait, to_u64(value)?, source),
        "agent.timeouts_ms.screenshot" => {
            merge_u64(&mut snapshot.agent.timeouts_ms.screenshot, to_u64(value)?, source)
        }
        "targets.allow_multiple_targets" => {
            merge_bool(&mut snapshot.targets.allow_multiple_targets, to_bool(value)?)
        }
        "targets.health_probe_interval_ms" => merge_u64(
            &mut snapshot.targets.health_probe_interval_ms,
            to_u64(value)?,
            source,
        ),
        "features.metrics_export" => merge_bool(&mut snapshot.features.metrics_export, to_bool(value)?),
        "features.vision_enabled" => merge_bool(&mut snapshot.features.vision_enabled, to_bool(value)?),
        "features.anti_oscillation_guard" => {
            merge_bool(&mut snapshot.features.anti_oscillation_guard, to_bool(value)?)
        }
        "features.watchdogs_enabled" => merge_bool(&mut snapshot.features.watchdogs_enabled, to_bool(value)?),
        path => return Err(ConfigError::UnsupportedPath(path.to_string())),
    };
    if changed {
        record_provenance(snapshot, path, source);
    }
    Ok(())
}

fn merge_usize(target: &mut usize, candidate: usize, source: ConfigSource) -> bool {
    let original = *target;
    if matches!(source, ConfigSource::RuntimeOverride | ConfigSource::Cli) {
        *target = candidate;
    } else {
        *target = (*target).min(candidate);
    }
    *target != original
}

fn merge_u64(target: &mut u64, candidate: u64, source: ConfigSource) -> bool {
    let original = *target;
    if matches!(source, ConfigSource::RuntimeOverride | ConfigSource::Cli) {
        *target = candidate;
    } else {
        *target = (*target).min(candidate);
    }
    *target != original
}

fn merge_u8(target: &mut u8, candidate: u8, source: ConfigSource) -> bool {
    let original = *target;
    if matches!(source, ConfigSource::RuntimeOverride | ConfigSource::Cli) {
        *target = candidate;
    } else {
        *target = (*target).min(candidate);
    }
    *target != original
}

fn merge_bool(target: &mut bool, candidate: bool) -> bool {
    let original = *target;
    *target = candidate;
    *target != original
}

fn record_provenance(snapshot: &mut ConfigSnapshot, path: &str, source: ConfigSource) {
    snapshot.set_provenance(path, source);
}

fn to_usize(value: &Value) -> Result<usize, ConfigError> {
    value
        .as_u64()
        .or_else(|| value.as_i64().map(|v| v as u64))
        .map(|v| v as usize)
        .ok_or_else(|| ConfigError::InvalidValue(format!("expected integer, got {value}")))
}

fn to_u8(value: &Value) -> Result<u8, ConfigError> {
    value
        .as_u64()
        .or_else(|| value.as_i64().map(|v| v as u64))
        .ok_or_else(|| ConfigError::InvalidValue(format!("expected integer, got {value}")))
        .and_then(|v| {
            if v <= u8::MAX as u64 {
                Ok(v as u8)
            } else {
                Err(ConfigError::InvalidValue(format!("value {v} exceeds u8")))
            }
        })
}

fn to_u64(value: &Value) -> Result<u64, ConfigError> {
    value
        .as_u64()
        .or_else(|| value.as_i64().map(|v| v as u64))
        .ok_or_else(|| ConfigError::InvalidValue(format!("expected integer, got {value}")))
}

fn to_bool(value: &Value) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::InvalidValue(format!("expected bool, got {value}")))
}
