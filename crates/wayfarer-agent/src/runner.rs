//! The observe → compose → decide → dispatch loop (spec §4.I): per step,
//! snapshot the page, replace the composer's state message, invoke the
//! model, parse its reply, dispatch up to `max_actions_per_step` actions
//! through the registry, and repeat until `done`, cancellation, or
//! `max_iterations`.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use wayfarer_actions::{ActionCtx, ActionRegistry};
use wayfarer_composer::{BrowserStateView, Composer, ComposerConfig};
use wayfarer_core::{Action, ActionResult, TargetId, TaskId, WayfarerError};
use wayfarer_serializer::{SelectorMap, SerializeOptions, Serializer};
use wayfarer_snapshot_hub::{PerceptionHub, PerceptionOptions};
use wayfarer_targets::TargetManagerImpl;

use crate::config::AgentLoopConfig;
use crate::history::RecentActions;
use crate::reply::parse_model_reply;
use crate::view::{active_tab, derive_scroll, derive_stats};
use crate::model::ModelCapability;

/// Terminal status of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentLoopStatus {
    Done { success: bool, message: String },
    Cancelled,
    MaxIterationsReached,
    Failed(String),
}

/// One dispatched action and how it resolved, kept for the caller's record.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub iteration: u32,
    pub thinking: String,
    pub action_type: String,
    pub result: Option<ActionResult>,
}

#[derive(Debug, Clone)]
pub struct AgentLoopResult {
    pub status: AgentLoopStatus,
    pub iterations: u32,
    pub history: Vec<StepRecord>,
}

impl AgentLoopResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, AgentLoopStatus::Done { success: true, .. })
    }
}

pub struct AgentLoop {
    config: AgentLoopConfig,
    model: Arc<dyn ModelCapability>,
    registry: Arc<ActionRegistry>,
    hub: Arc<dyn PerceptionHub>,
    targets: Arc<TargetManagerImpl>,
    serializer: Serializer,
    selector_map: Arc<RwLock<Option<SelectorMap>>>,
}

impl AgentLoop {
    pub fn new(
        config: AgentLoopConfig,
        model: Arc<dyn ModelCapability>,
        registry: Arc<ActionRegistry>,
        hub: Arc<dyn PerceptionHub>,
        targets: Arc<TargetManagerImpl>,
    ) -> Self {
        Self {
            config,
            model,
            registry,
            hub,
            targets,
            serializer: Serializer::new(SerializeOptions::default()),
            selector_map: Arc::new(RwLock::new(None)),
        }
    }

    /// Shared handle onto the selector map produced by the most recently
    /// completed step. Action handlers that take an `index` parameter
    /// (click, input, scroll, select_dropdown, ...) resolve it against this
    /// map to get the `BackendNodeId` the action catalog's manifests never
    /// carry themselves.
    pub fn selector_map_handle(&self) -> Arc<RwLock<Option<SelectorMap>>> {
        Arc::clone(&self.selector_map)
    }

    /// Adopts an externally created selector-map handle in place of this
    /// loop's own, so a caller that built the action registry before the
    /// loop can share one map between both instead of drifting apart.
    pub fn with_shared_selector_map(mut self, selector_map: Arc<RwLock<Option<SelectorMap>>>) -> Self {
        self.selector_map = selector_map;
        self
    }

    #[tracing::instrument(skip_all, fields(target = %target))]
    pub async fn run(&self, task: &str, target: TargetId, cancel: CancellationToken) -> AgentLoopResult {
        let manifests = self.registry.manifests();
        let mut composer = Composer::new(task, &manifests, ComposerConfig::default());
        let mut recent_actions = RecentActions::new();
        let mut previous_selector_map: Option<SelectorMap> = None;
        let mut previous_evaluation: Option<String> = None;
        let mut history = Vec::new();
        let task_id = TaskId::new();

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                return AgentLoopResult { status: AgentLoopStatus::Cancelled, iterations: iteration - 1, history };
            }

            let step = self
                .run_step(
                    &target,
                    &task_id,
                    &mut composer,
                    &mut recent_actions,
                    &mut previous_selector_map,
                    previous_evaluation.take(),
                    iteration,
                    &cancel,
                )
                .await;

            match step {
                Ok(StepOutcome::Continue { records, evaluation }) => {
                    history.extend(records);
                    previous_evaluation = evaluation;
                }
                Ok(StepOutcome::Done { success, message, records }) => {
                    history.extend(records);
                    return AgentLoopResult {
                        status: AgentLoopStatus::Done { success, message },
                        iterations: iteration,
                        history,
                    };
                }
                Err(err) if !err.is_recoverable() => {
                    return AgentLoopResult {
                        status: AgentLoopStatus::Failed(err.long_term_memory().to_string()),
                        iterations: iteration,
                        history,
                    };
                }
                Err(err) => {
                    composer.observe(err.long_term_memory());
                    previous_evaluation = Some(err.long_term_memory().to_string());
                }
            }
        }

        AgentLoopResult { status: AgentLoopStatus::MaxIterationsReached, iterations: self.config.max_iterations, history }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_step(
        &self,
        target: &TargetId,
        task_id: &TaskId,
        composer: &mut Composer,
        recent_actions: &mut RecentActions,
        previous_selector_map: &mut Option<SelectorMap>,
        previous_evaluation: Option<String>,
        iteration: u32,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, WayfarerError> {
        let options = PerceptionOptions { capture_screenshot: self.config.enable_vision, ..Default::default() };
        let snapshot = self.hub.perceive(target.clone(), options).await?;
        let serialized = self.serializer.serialize(&snapshot.structural, previous_selector_map.as_ref());
        *self.selector_map.write() = Some(serialized.selector_map.clone());

        let (tab_url, tab_title) = active_tab(&snapshot);
        let view = BrowserStateView {
            url: tab_url.unwrap_or("about:blank"),
            title: tab_title,
            listing: &serialized.listing,
            stats: derive_stats(&serialized),
            scroll: derive_scroll(&snapshot.structural),
            screenshot_attached: snapshot.screenshot.is_some(),
        };
        composer.update_state(&view, previous_evaluation.as_deref());

        let reply_text = self.model.chat(composer.conversation().messages()).await?;
        let parsed = parse_model_reply(&reply_text)?;
        composer.observe(format!("thinking: {}", parsed.thinking));

        let target_ctx = self.targets.get_target(target)?;
        let max_actions = self.config.max_actions_per_step as usize;
        let queued: Vec<_> = parsed.actions.into_iter().take(max_actions).collect();

        let all_scroll = !queued.is_empty() && queued.iter().all(|a| a.action_type == "scroll");
        if all_scroll {
            let directions: Vec<&str> =
                queued.iter().filter_map(|a| a.params.get("direction").and_then(|v| v.as_str())).collect();
            if recent_actions.alternations_with_pending(&directions, self.config.oscillation_window) >= 2 {
                composer.observe(
                    "Scrolling back and forth without progress. Try `find_text` or scrolling a specific container by index instead.",
                );
                return Ok(StepOutcome::Continue { records: Vec::new(), evaluation: None });
            }
        }

        let mut records = Vec::new();
        let mut evaluation = None;

        for queued_action in queued {
            if cancel.is_cancelled() {
                break;
            }

            let direction = queued_action.params.get("direction").and_then(|v| v.as_str()).map(str::to_string);
            recent_actions.record(direction);

            if queued_action.action_type == "done" {
                let success = queued_action.params.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
                let message = queued_action
                    .params
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("task complete")
                    .to_string();
                records.push(StepRecord {
                    iteration,
                    thinking: parsed.thinking.clone(),
                    action_type: "done".to_string(),
                    result: None,
                });
                return Ok(StepOutcome::Done { success, message, records });
            }

            let deadline = Instant::now() + std::time::Duration::from_millis(self.config.navigation_timeout_ms);
            let ctx = ActionCtx::new(task_id.clone(), target_ctx.cdp_page, deadline, cancel.clone());
            let action = Action::new(queued_action.action_type.clone(), queued_action.params.clone());

            let dispatched = self.registry.execute(&ctx, action).await;
            match dispatched {
                Ok(result) => {
                    if let Some(memory) = &result.long_term_memory {
                        composer.observe(memory.clone());
                        evaluation = Some(memory.clone());
                    }
                    let stop_on_failure = result.success == Some(false) || result.error.is_some();
                    records.push(StepRecord {
                        iteration,
                        thinking: parsed.thinking.clone(),
                        action_type: queued_action.action_type,
                        result: Some(result),
                    });
                    if stop_on_failure {
                        break;
                    }
                }
                Err(err) => {
                    composer.observe(err.long_term_memory());
                    evaluation = Some(err.long_term_memory().to_string());
                    records.push(StepRecord {
                        iteration,
                        thinking: parsed.thinking.clone(),
                        action_type: queued_action.action_type,
                        result: None,
                    });
                    if !err.is_recoverable() {
                        return Err(err);
                    }
                    break;
                }
            }
        }

        *previous_selector_map = Some(serialized.selector_map);
        Ok(StepOutcome::Continue { records, evaluation })
    }
}

enum StepOutcome {
    Continue { records: Vec<StepRecord>, evaluation: Option<String> },
    Done { success: bool, message: String, records: Vec<StepRecord> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_is_success_only_on_a_successful_done() {
        let done = AgentLoopResult {
            status: AgentLoopStatus::Done { success: true, message: "finished".to_string() },
            iterations: 3,
            history: Vec::new(),
        };
        assert!(done.is_success());

        let failed = AgentLoopResult { status: AgentLoopStatus::MaxIterationsReached, iterations: 100, history: Vec::new() };
        assert!(!failed.is_success());
    }
}
