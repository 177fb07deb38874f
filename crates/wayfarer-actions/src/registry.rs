use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::instrument;
use wayfarer_core::action::ParamValue;
use wayfarer_core::{Action, ActionResult, WayfarerError};

use crate::errors::ActionRegistryError;
use crate::handler::{ActionCtx, ActionHandler};
use crate::manifest::ActionManifest;
use crate::validator::validate_params;

struct RegisteredAction {
    manifest: ActionManifest,
    handler: Arc<dyn ActionHandler>,
}

/// The action registry (spec §4.F): one named table of `{manifest, handler}`
/// pairs. `execute` validates before dispatching so a handler never observes
/// an unknown key or a missing required parameter.
#[derive(Default)]
pub struct ActionRegistry {
    actions: std::collections::HashMap<String, RegisteredAction>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self { actions: std::collections::HashMap::new() }
    }

    pub fn register(&mut self, manifest: ActionManifest, handler: Arc<dyn ActionHandler>) -> Result<(), ActionRegistryError> {
        if self.actions.contains_key(&manifest.name) {
            return Err(ActionRegistryError::DuplicateAction(manifest.name));
        }
        self.actions.insert(manifest.name.clone(), RegisteredAction { manifest, handler });
        Ok(())
    }

    pub fn manifest(&self, action_type: &str) -> Option<&ActionManifest> {
        self.actions.get(action_type).map(|a| &a.manifest)
    }

    /// All manifests, sorted by name, for the composer to render into the
    /// system prompt.
    pub fn manifests(&self) -> Vec<&ActionManifest> {
        let mut list: Vec<&ActionManifest> = self.actions.values().map(|a| &a.manifest).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    #[instrument(skip_all, fields(action_type = %action.action_type))]
    pub async fn execute(&self, ctx: &ActionCtx, action: Action) -> Result<ActionResult, WayfarerError> {
        self.dispatch(ctx, &action.action_type, action.params).await
    }

    pub async fn dispatch(&self, ctx: &ActionCtx, action_type: &str, params: BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let Some(entry) = self.actions.get(action_type) else {
            return Err(ActionRegistryError::UnknownAction(action_type.to_string()).into());
        };
        validate_params(&entry.manifest, &params)?;
        entry.handler.execute(ctx, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ParamSpec, ParamType};
    use async_trait::async_trait;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;
    use wayfarer_cdp::PageId;
    use wayfarer_core::TaskId;

    struct EchoHandler;

    #[async_trait]
    impl ActionHandler for EchoHandler {
        async fn execute(&self, _ctx: &ActionCtx, _params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
            Ok(ActionResult::ok("done"))
        }
    }

    fn ctx() -> ActionCtx {
        ActionCtx::new(TaskId::new(), PageId::new(), Instant::now() + Duration::from_secs(5), CancellationToken::new())
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let registry = ActionRegistry::new();
        let err = registry.dispatch(&ctx(), "nope", BTreeMap::new()).await.unwrap_err();
        assert_eq!(err.kind, wayfarer_core::ErrorKind::InvalidActionSchema);
    }

    #[tokio::test]
    async fn invalid_params_never_reach_the_handler() {
        let mut registry = ActionRegistry::new();
        registry
            .register(
                ActionManifest::new("click", "click", vec![ParamSpec::required("index", ParamType::Integer, "index")]),
                Arc::new(EchoHandler),
            )
            .unwrap();
        let err = registry.dispatch(&ctx(), "click", BTreeMap::new()).await.unwrap_err();
        assert_eq!(err.kind, wayfarer_core::ErrorKind::InvalidActionSchema);
    }

    #[tokio::test]
    async fn well_formed_call_dispatches() {
        let mut registry = ActionRegistry::new();
        registry
            .register(
                ActionManifest::new("click", "click", vec![ParamSpec::required("index", ParamType::Integer, "index")]),
                Arc::new(EchoHandler),
            )
            .unwrap();
        let mut params = BTreeMap::new();
        params.insert("index".to_string(), ParamValue::Number(1.0));
        let result = registry.dispatch(&ctx(), "click", params).await.unwrap();
        assert_eq!(result.long_term_memory.as_deref(), Some("done"));
    }
}
