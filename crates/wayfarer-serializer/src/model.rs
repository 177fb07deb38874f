//! Output types for the interactive-element serialiser (spec §4.D).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use wayfarer_core::BackendNodeId;

/// index → backend-node-id, per spec glossary. One snapshot's lifetime only.
pub type SelectorMap = HashMap<u32, BackendNodeId>;

#[derive(Clone, Debug)]
pub struct SerializeOptions {
    pub enable_bbox_filtering: bool,
    pub containment_threshold: f64,
    pub paint_order_filtering: bool,
    pub max_text_length: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            enable_bbox_filtering: true,
            containment_threshold: 0.99,
            paint_order_filtering: true,
            max_text_length: 100,
        }
    }
}

/// A retained node after prune/classify/fold, carrying the flags steps 4-6
/// attach to it. Present in the tree even when `ignored_by_paint_order` or
/// `excluded_by_parent` suppress it from getting an index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimplifiedNode {
    pub backend_node_id: BackendNodeId,
    pub tag: String,
    pub depth: u32,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub is_interactive: bool,
    pub ignored_by_paint_order: bool,
    pub excluded_by_parent: bool,
    pub is_shadow_host: bool,
    pub scrollable: bool,
    pub index: Option<u32>,
    pub is_new: bool,
    pub children: Vec<SimplifiedNode>,
}

#[derive(Clone, Debug, Default)]
pub struct SerializeTimings {
    pub stages_us: BTreeMap<String, u64>,
}

impl SerializeTimings {
    pub fn record(&mut self, stage: &str, micros: u64) {
        self.stages_us.insert(stage.to_string(), micros);
    }

    pub fn total_us(&self) -> u64 {
        self.stages_us.values().sum()
    }
}

#[derive(Clone, Debug)]
pub struct SerializeOutput {
    pub root: Option<SimplifiedNode>,
    pub selector_map: SelectorMap,
    pub listing: String,
    pub timings: SerializeTimings,
}
