//! Builds the one object graph every subcommand needs: a CDP adapter, the
//! target/session manager, the perception hub, a fully populated action
//! registry, and — for `run` — a model client and an `AgentLoop`.

use std::sync::Arc;

use parking_lot::RwLock;
use wayfarer_actions::{build_registry, ActionRegistry, ActionRegistryError};
use wayfarer_agent::{AgentLoop, AgentLoopConfig};
use wayfarer_cdp::{CdpAdapter, CdpConfig};
use wayfarer_config::ConfigSnapshot;
use wayfarer_core::SessionId;
use wayfarer_event_bus::EventBus;
use wayfarer_serializer::SelectorMap;
use wayfarer_snapshot_hub::{PerceptionHub, PerceptionHubImpl};
use wayfarer_targets::TargetManagerImpl;

use crate::actions::build_handlers;
use crate::model::OpenAiCompatibleModel;

/// Everything a subcommand needs to address the browser: the adapter, the
/// target manager built on top of it, and the bus they both emit onto.
pub struct BrowserRuntime {
    pub cdp: Arc<CdpAdapter>,
    pub bus: EventBus,
    pub targets: Arc<TargetManagerImpl>,
    pub hub: Arc<dyn PerceptionHub>,
}

pub fn build_browser_runtime(config: &ConfigSnapshot) -> BrowserRuntime {
    let bus = EventBus::new();
    let mut cdp_config = CdpConfig::default();
    cdp_config.default_deadline_ms = config.agent.timeouts_ms.navigate;
    cdp_config.heartbeat_interval_ms = config.targets.health_probe_interval_ms;

    let cdp = Arc::new(CdpAdapter::new(cdp_config, bus.clone()));
    let targets = Arc::new(TargetManagerImpl::new(Arc::clone(&cdp), bus.clone()));
    let hub: Arc<dyn PerceptionHub> = Arc::new(PerceptionHubImpl::new(Arc::clone(&cdp), Arc::clone(&targets)));

    BrowserRuntime { cdp, bus, targets, hub }
}

/// Wires every catalog action name to a concrete handler, scoped to the one
/// session the subcommand is driving. Kept separate from `build_agent_loop`
/// so callers that only need the manifests (e.g. to print the catalog)
/// don't have to spin up a browser runtime first.
pub fn build_action_registry(
    runtime: &BrowserRuntime,
    session: SessionId,
    selector_map: Arc<RwLock<Option<SelectorMap>>>,
) -> Result<ActionRegistry, ActionRegistryError> {
    let mut handlers = build_handlers(runtime, session, selector_map);
    build_registry(move |name| handlers.remove(name))
}

/// Builds the loop on top of an already-constructed registry, adopting the
/// same selector-map handle the registry's `index`-taking handlers resolve
/// against — otherwise the loop's own map and the handlers' map would be two
/// unsynchronized copies.
pub fn build_agent_loop(
    config: &ConfigSnapshot,
    runtime: &BrowserRuntime,
    registry: Arc<ActionRegistry>,
    selector_map: Arc<RwLock<Option<SelectorMap>>>,
    model_api_base: Option<String>,
    model_name: Option<String>,
) -> AgentLoop {
    let model = Arc::new(OpenAiCompatibleModel::from_env(model_api_base, model_name));
    let loop_config = AgentLoopConfig::new()
        .max_iterations(config.agent.limits.max_steps as u32)
        .max_actions_per_step(config.agent.limits.max_actions_per_step as u32)
        .vision(config.features.vision_enabled);

    AgentLoop::new(loop_config, model, registry, Arc::clone(&runtime.hub), Arc::clone(&runtime.targets))
        .with_shared_selector_map(selector_map)
}
