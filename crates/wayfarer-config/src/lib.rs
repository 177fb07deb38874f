pub mod api;
pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod override_store;

pub use api::{ConfigCenter, ConfigGuard, InMemoryConfigCenter};
pub use defaults::default_snapshot;
pub use errors::ConfigError;
pub use loader::load_snapshot;
pub use model::{
    ConfigSnapshot, ConfigView, RuntimeOverrideSpec, SnapshotPolicies, StructuralCachePolicy,
    StructuralDiffPolicy, StructuralJudgePolicy, StructuralPerceiverPolicy, StructuralResolvePolicy,
    StructuralScoreWeights,
};

#[cfg(test)]
mod tests;
