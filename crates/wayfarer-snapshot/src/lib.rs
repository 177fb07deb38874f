//! DOM/accessibility/layout snapshot collection for one target (spec §4.C).
//!
//! A single `collect` call produces a self-consistent `EnhancedNode` forest
//! cross-linked by backend-node-id: the DOM tree (shadow roots included),
//! the accessibility tree, layout bounds/paint-order, and a small computed-
//! style subset, plus the viewport and scroll position read at the same
//! moment. Collection never mutates the page. A short-TTL cache, eagerly
//! invalidated on navigation via [`LifecycleWatcher`], absorbs bursts of
//! repeat reads within one agent step.

pub mod cache;
pub mod collector;
pub mod errors;
pub mod lifecycle;
pub mod metrics;
pub mod model;

pub use cache::SnapshotCache;
pub use collector::{SnapshotCollector, StructuralCollector};
pub use errors::SnapshotError;
pub use lifecycle::LifecycleWatcher;
pub use model::{
    AxInfo, BoundingRect, CollectionTimings, ComputedStyleSubset, EnhancedNode, ScrollPosition,
    Snapshot, Viewport,
};
