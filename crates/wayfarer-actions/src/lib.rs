//! Named, typed, parameter-validated action table: the boundary between the
//! agent loop's parsed model output and the tool crates that actually touch
//! the page.

pub mod catalog;
pub mod errors;
pub mod handler;
pub mod manifest;
pub mod registry;
pub mod validator;

pub use errors::ActionRegistryError;
pub use handler::{ActionCtx, ActionHandler};
pub use manifest::{ActionManifest, ParamSpec, ParamType};
pub use registry::ActionRegistry;

/// A fresh registry with every catalog entry registered against `handler_for`,
/// which maps an action name to its handler. Returns an error if
/// `handler_for` leaves an action unmapped (treated as a missing handler).
pub fn build_registry<F>(mut handler_for: F) -> Result<ActionRegistry, ActionRegistryError>
where
    F: FnMut(&str) -> Option<std::sync::Arc<dyn ActionHandler>>,
{
    let mut registry = ActionRegistry::new();
    for manifest in catalog::all() {
        let name = manifest.name.clone();
        let handler = handler_for(&name).ok_or_else(|| ActionRegistryError::UnknownAction(name))?;
        registry.register(manifest, handler)?;
    }
    Ok(registry)
}
