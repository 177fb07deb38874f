//! The `EnhancedNode` forest spec glossary: a per-node key stable within one
//! page (`BackendNodeId`), parent/children links, and the DOM/AX/layout facts
//! cross-linked onto it by the collector.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use wayfarer_core::BackendNodeId;

/// Computed-style subset spec glossary calls for: just enough to judge
/// visibility and affordance without shipping the full cascade.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComputedStyleSubset {
    pub background_color: Option<String>,
    pub opacity: Option<String>,
    pub cursor: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingRect {
    /// Invariant: "bounds non-negative width/height if present".
    pub fn is_valid(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct AxInfo {
    pub role: Option<String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct EnhancedNode {
    pub backend_node_id: BackendNodeId,
    pub parent: Option<BackendNodeId>,
    pub children: Vec<BackendNodeId>,
    pub tag: String,
    pub node_type: u32,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub ax: AxInfo,
    pub bounds: Option<BoundingRect>,
    pub paint_order: Option<i64>,
    pub computed_style: ComputedStyleSubset,
    pub scrollable: bool,
    pub is_shadow_host: bool,
    pub shadow_root_children: Vec<BackendNodeId>,
}

impl EnhancedNode {
    pub fn new(backend_node_id: BackendNodeId, tag: impl Into<String>, node_type: u32) -> Self {
        Self {
            backend_node_id,
            parent: None,
            children: Vec::new(),
            tag: tag.into(),
            node_type,
            attributes: BTreeMap::new(),
            text: None,
            ax: AxInfo::default(),
            bounds: None,
            paint_order: None,
            computed_style: ComputedStyleSubset::default(),
            scrollable: false,
            is_shadow_host: false,
            shadow_root_children: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// Wall-clock breakdown of one collection call, keyed by stage name.
#[derive(Clone, Debug, Default)]
pub struct CollectionTimings {
    pub stages_ms: BTreeMap<String, u64>,
}

impl CollectionTimings {
    pub fn record(&mut self, stage: &str, millis: u64) {
        self.stages_ms.insert(stage.to_string(), millis);
    }

    pub fn total_ms(&self) -> u64 {
        self.stages_ms.values().sum()
    }
}

/// One self-consistent DOM/AX/layout view of a target, produced by a single
/// collection call (spec §4.C). One-snapshot lifetime: callers don't hold a
/// `Snapshot` across page interactions.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub root: BackendNodeId,
    pub nodes: BTreeMap<BackendNodeId, EnhancedNode>,
    pub viewport: Viewport,
    pub scroll: ScrollPosition,
    pub collected_at: DateTime<Utc>,
    pub timings: CollectionTimings,
}

impl Snapshot {
    pub fn get(&self, id: BackendNodeId) -> Option<&EnhancedNode> {
        self.nodes.get(&id)
    }

    pub fn children_of(&self, id: BackendNodeId) -> &[BackendNodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }
}
