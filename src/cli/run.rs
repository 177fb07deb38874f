//! `wayfarer run <task>` — launches a session, drives the agent loop to
//! completion or cancellation, and reports the outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use wayfarer_agent::AgentLoopStatus;
use wayfarer_config::ConfigSnapshot;

use crate::errors::ExitCode;
use crate::wiring::{build_action_registry, build_agent_loop, build_browser_runtime};

const LAUNCH_PROFILE: &str = "default";

pub async fn cmd_run(
    config: &ConfigSnapshot,
    task: &str,
    start_url: &str,
    model_api_base: Option<String>,
    model_name: Option<String>,
) -> Result<ExitCode> {
    let runtime = build_browser_runtime(config);
    let (session, target) = runtime.targets.launch(LAUNCH_PROFILE).await.context("launching browser session")?;

    if start_url != "about:blank" {
        let deadline = Duration::from_millis(config.agent.timeouts_ms.navigate);
        runtime.targets.navigate(target.clone(), start_url, false, deadline).await.context("navigating to start URL")?;
    }

    let selector_map = Arc::new(RwLock::new(None));
    let registry = Arc::new(build_action_registry(&runtime, session.clone(), Arc::clone(&selector_map)).context("building action registry")?);
    let agent_loop = build_agent_loop(config, &runtime, registry, selector_map, model_api_base, model_name);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let result = agent_loop.run(task, target, cancel).await;

    for step in &result.history {
        let ok = step.result.as_ref().and_then(|r| r.success).unwrap_or(true);
        tracing::info!(iteration = step.iteration, action = %step.action_type, ok, "step finished");
    }

    match &result.status {
        AgentLoopStatus::Done { success: true, message } => {
            println!("done: {message}");
            Ok(ExitCode::Success)
        }
        AgentLoopStatus::Done { success: false, message } => {
            println!("task failed: {message}");
            Ok(ExitCode::TaskFailed)
        }
        AgentLoopStatus::Cancelled => {
            println!("cancelled after {} iteration(s)", result.iterations);
            Ok(ExitCode::Cancelled)
        }
        AgentLoopStatus::MaxIterationsReached => {
            println!("stopped after reaching the {} iteration cap", result.iterations);
            Ok(ExitCode::TaskFailed)
        }
        AgentLoopStatus::Failed(message) => {
            println!("run failed: {message}");
            Ok(ExitCode::TaskFailed)
        }
    }
}
