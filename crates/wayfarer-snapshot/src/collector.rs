//! Collects a self-consistent `EnhancedNode` forest for one target: the full
//! accessibility tree, the DOM tree including shadow roots, a layout pass
//! with bounds/paint-order/computed-styles, and scroll/viewport metrics
//! (spec §4.C). Collection reads only — `Cdp::dom_snapshot`/`ax_snapshot`
//! and a `window.*` read-only `evaluate_script` call, nothing that mutates
//! the page.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};
use wayfarer_cdp::{AxSnapshotConfig, Cdp, DomSnapshotConfig, PageId};
use wayfarer_core::BackendNodeId;

use crate::cache::SnapshotCache;
use crate::errors::SnapshotError;
use crate::metrics;
use crate::model::{
    AxInfo, BoundingRect, CollectionTimings, ComputedStyleSubset, EnhancedNode, ScrollPosition,
    Snapshot, Viewport,
};

#[async_trait]
pub trait SnapshotCollector: Send + Sync {
    async fn collect(&self, page: PageId) -> Result<Snapshot, SnapshotError>;
}

pub struct StructuralCollector<C>
where
    C: Cdp + Send + Sync,
{
    cdp: Arc<C>,
    cache: SnapshotCache,
}

impl<C> StructuralCollector<C>
where
    C: Cdp + Send + Sync,
{
    pub fn new(cdp: Arc<C>) -> Self {
        Self {
            cdp,
            cache: SnapshotCache::new(Duration::from_millis(250)),
        }
    }

    async fn read_viewport_and_scroll(
        &self,
        page: PageId,
    ) -> Result<(Viewport, ScrollPosition), SnapshotError> {
        let value = self
            .cdp
            .evaluate_script(
                page,
                "({w: window.innerWidth, h: window.innerHeight, sx: window.scrollX, sy: window.scrollY})",
            )
            .await?;
        let width = value.get("w").and_then(Value::as_u64).unwrap_or(0) as u32;
        let height = value.get("h").and_then(Value::as_u64).unwrap_or(0) as u32;
        let x = value.get("sx").and_then(Value::as_f64).unwrap_or(0.0);
        let y = value.get("sy").and_then(Value::as_f64).unwrap_or(0.0);
        Ok((Viewport { width, height }, ScrollPosition { x, y }))
    }
}

#[async_trait]
impl<C> SnapshotCollector for StructuralCollector<C>
where
    C: Cdp + Send + Sync,
{
    async fn collect(&self, page: PageId) -> Result<Snapshot, SnapshotError> {
        if let Some(hit) = self.cache.get(page) {
            metrics::record_collect(true, Duration::ZERO);
            return Ok(hit);
        }

        let started = Instant::now();
        let mut timings = CollectionTimings::default();

        let dom_started = Instant::now();
        let dom = self
            .cdp
            .dom_snapshot(
                page,
                DomSnapshotConfig {
                    include_styles: true,
                    include_shadow_dom: true,
                    max_depth: None,
                },
            )
            .await?;
        timings.record("dom", dom_started.elapsed().as_millis() as u64);

        let ax_started = Instant::now();
        let ax = self
            .cdp
            .ax_snapshot(page, AxSnapshotConfig::default())
            .await?;
        timings.record("ax", ax_started.elapsed().as_millis() as u64);

        let viewport_started = Instant::now();
        let (viewport, scroll) = self.read_viewport_and_scroll(page).await?;
        timings.record("viewport", viewport_started.elapsed().as_millis() as u64);

        let build_started = Instant::now();
        let mut nodes = parse_dom_forest(&dom.raw)?;
        apply_ax_tree(&ax.raw, &mut nodes);
        timings.record("build", build_started.elapsed().as_millis() as u64);

        let root = find_root(&nodes)?;
        timings.record("total", started.elapsed().as_millis() as u64);

        let snapshot = Snapshot {
            root,
            nodes,
            viewport,
            scroll,
            collected_at: chrono::Utc::now(),
            timings,
        };

        metrics::record_collect(false, started.elapsed());
        self.cache.put(page, snapshot.clone());
        Ok(snapshot)
    }
}

/// Decodes one `DOMSnapshot.captureSnapshot`-shaped payload
/// (`documents[].nodes.*` struct-of-arrays, indexed into a shared
/// `strings` table) into a parent-linked `EnhancedNode` forest.
fn parse_dom_forest(raw: &Value) -> Result<BTreeMap<BackendNodeId, EnhancedNode>, SnapshotError> {
    let strings = raw
        .get("strings")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let documents = raw
        .get("documents")
        .and_then(Value::as_array)
        .ok_or_else(|| SnapshotError::MalformedSnapshot("missing `documents` array".into()))?;

    let mut nodes = BTreeMap::new();
    for document in documents {
        parse_document(document, &strings, &mut nodes)?;
    }
    if nodes.is_empty() {
        return Err(SnapshotError::MalformedSnapshot(
            "snapshot contained no nodes".into(),
        ));
    }
    Ok(nodes)
}

fn parse_document(
    document: &Value,
    strings: &[Value],
    out: &mut BTreeMap<BackendNodeId, EnhancedNode>,
) -> Result<(), SnapshotError> {
    let nodes_obj = document
        .get("nodes")
        .and_then(Value::as_object)
        .ok_or_else(|| SnapshotError::MalformedSnapshot("document missing `nodes`".into()))?;

    let backend_ids: Vec<i64> = nodes_obj
        .get("backendNodeId")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    if backend_ids.is_empty() {
        return Ok(());
    }

    let node_types: Vec<u32> = nodes_obj
        .get("nodeType")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).map(|v| v as u32).collect())
        .unwrap_or_default();
    let node_names = nodes_obj.get("nodeName").and_then(Value::as_array);
    let node_values = nodes_obj.get("nodeValue").and_then(Value::as_array);
    let attributes = nodes_obj.get("attributes").and_then(Value::as_array);
    let parent_index = nodes_obj.get("parentIndex").and_then(Value::as_array);
    let shadow_root_type = nodes_obj.get("shadowRootType").and_then(Value::as_object);
    let is_clickable = nodes_obj.get("isClickable").and_then(Value::as_object);
    let node_style_refs = nodes_obj.get("computedStyles").and_then(Value::as_array);
    let computed_styles = document.get("computedStyles").and_then(Value::as_array);

    let index_to_backend: BTreeMap<usize, BackendNodeId> = backend_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (idx, BackendNodeId(*id)))
        .collect();

    let shadow_root_indices = rare_sparse_indices(shadow_root_type);
    let clickable_indices = rare_sparse_indices(is_clickable);

    for (idx, backend_id) in backend_ids.iter().enumerate() {
        let key = BackendNodeId(*backend_id);
        let tag = node_names
            .and_then(|arr| arr.get(idx))
            .and_then(|v| decode_string(strings, v))
            .unwrap_or_default();
        let node_type = node_types.get(idx).copied().unwrap_or(1);
        let mut node = EnhancedNode::new(key, tag, node_type);

        if let Some(parent_index) = parent_index {
            if let Some(parent_idx) = parent_index.get(idx).and_then(Value::as_i64) {
                if parent_idx >= 0 {
                    node.parent = index_to_backend.get(&(parent_idx as usize)).copied();
                }
            }
        }

        if let Some(node_values) = node_values {
            if let Some(text) = node_values.get(idx).and_then(|v| decode_string(strings, v)) {
                if !text.trim().is_empty() {
                    node.text = Some(text);
                }
            }
        }

        if let Some(attrs_arr) = attributes {
            if let Some(entry) = attrs_arr.get(idx).and_then(Value::as_array) {
                let mut iter = entry.iter();
                while let Some(name_idx) = iter.next() {
                    if let Some(value_idx) = iter.next() {
                        if let Some(name) = decode_string(strings, name_idx) {
                            let value = decode_string(strings, value_idx).unwrap_or_default();
                            node.attributes.insert(name, value);
                        }
                    }
                }
            }
        }

        node.is_shadow_host = shadow_root_indices.contains(&idx);
        if clickable_indices.contains(&idx) {
            node.ax.properties.insert("clickable".into(), "true".into());
        }

        if let (Some(node_style_refs), Some(computed_styles)) =
            (node_style_refs, computed_styles)
        {
            if let Some(style_entry) = node_style_refs.get(idx) {
                node.computed_style =
                    decode_computed_style(strings, style_entry, computed_styles);
            }
        }

        out.insert(key, node);
    }

    if let Some(layout) = document.get("layout").and_then(Value::as_object) {
        apply_layout(layout, &backend_ids, out);
    }

    // Second pass: wire parent -> children and shadow-host -> shadow children
    // now that every node in this document is present.
    let child_links: Vec<(BackendNodeId, BackendNodeId)> = out
        .values()
        .filter_map(|n| n.parent.map(|p| (p, n.backend_node_id)))
        .collect();
    for (parent, child) in child_links {
        if let Some(parent_node) = out.get_mut(&parent) {
            if parent_node.is_shadow_host {
                parent_node.shadow_root_children.push(child);
            } else {
                parent_node.children.push(child);
            }
        }
    }

    Ok(())
}

/// Decodes a CDP "rare data" sparse structure (`{index: [...], value: [...]}`)
/// into the set of node indices it marks present, ignoring the paired value
/// (used for boolean rare data where presence alone is the signal).
fn rare_sparse_indices(data: Option<&JsonMap<String, Value>>) -> std::collections::HashSet<usize> {
    data.and_then(|obj| obj.get("index"))
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).map(|v| v as usize).collect())
        .unwrap_or_default()
}

fn apply_layout(
    layout: &JsonMap<String, Value>,
    backend_ids: &[i64],
    out: &mut BTreeMap<BackendNodeId, EnhancedNode>,
) {
    let node_index = layout.get("nodeIndex").and_then(Value::as_array);
    let bounds = layout.get("bounds").and_then(Value::as_array);
    let paint_orders = layout.get("paintOrders").and_then(Value::as_array);

    let (node_index, bounds) = match (node_index, bounds) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };

    for (layout_idx, node_idx_val) in node_index.iter().enumerate() {
        let node_idx = match node_idx_val.as_u64().and_then(|v| usize::try_from(v).ok()) {
            Some(idx) => idx,
            None => continue,
        };
        let backend_id = match backend_ids.get(node_idx) {
            Some(id) => BackendNodeId(*id),
            None => continue,
        };
        let node = match out.get_mut(&backend_id) {
            Some(node) => node,
            None => continue,
        };

        let base = layout_idx * 4;
        if bounds.len() >= base + 4 {
            let rect = BoundingRect {
                x: bounds[base].as_f64().unwrap_or(0.0),
                y: bounds[base + 1].as_f64().unwrap_or(0.0),
                width: bounds[base + 2].as_f64().unwrap_or(0.0),
                height: bounds[base + 3].as_f64().unwrap_or(0.0),
            };
            if rect.is_valid() {
                node.bounds = Some(rect);
            }
        }

        if let Some(orders) = paint_orders {
            if let Some(order) = orders.get(layout_idx).and_then(Value::as_i64) {
                node.paint_order = Some(order);
            }
        }
    }
}

fn decode_computed_style(
    strings: &[Value],
    style_ref: &Value,
    computed_styles: &[Value],
) -> ComputedStyleSubset {
    let mut subset = ComputedStyleSubset::default();
    let style_indices: Vec<u64> = match style_ref {
        Value::Number(num) => num.as_u64().into_iter().collect(),
        Value::Array(values) => values.iter().filter_map(Value::as_u64).collect(),
        _ => Vec::new(),
    };
    for style_index in style_indices {
        let entry = match computed_styles.get(style_index as usize).and_then(Value::as_object) {
            Some(entry) => entry,
            None => continue,
        };
        let properties = entry.get("properties").and_then(Value::as_array);
        let values = entry.get("values").and_then(Value::as_array);
        let (properties, values) = match (properties, values) {
            (Some(p), Some(v)) => (p, v),
            _ => continue,
        };
        for (prop_idx, value_idx) in properties.iter().zip(values.iter()) {
            let name = match decode_string(strings, prop_idx) {
                Some(name) => name,
                None => continue,
            };
            let value = decode_string(strings, value_idx).unwrap_or_default();
            match name.as_str() {
                "background-color" => subset.background_color = Some(value),
                "opacity" => subset.opacity = Some(value),
                "cursor" => subset.cursor = Some(value),
                _ => {}
            }
        }
    }
    subset
}

fn decode_string(strings: &[Value], value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(num) => num.as_u64().and_then(|idx| {
            strings
                .get(idx as usize)
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        }),
        _ => None,
    }
}

/// Cross-links the `Accessibility.getFullAXTree`-shaped payload (a flat
/// `nodes[]` list, each carrying its own `backendDOMNodeId`) onto the DOM
/// forest by backend-node-id.
fn apply_ax_tree(raw: &Value, nodes: &mut BTreeMap<BackendNodeId, EnhancedNode>) {
    let ax_nodes = match raw.get("nodes").and_then(Value::as_array) {
        Some(nodes) => nodes,
        None => return,
    };
    for ax_node in ax_nodes {
        let backend_id = match ax_node.get("backendDOMNodeId").and_then(Value::as_i64) {
            Some(id) => BackendNodeId(id),
            None => continue,
        };
        let node = match nodes.get_mut(&backend_id) {
            Some(node) => node,
            None => continue,
        };
        if let Some(role) = ax_node
            .get("role")
            .and_then(|r| r.get("value"))
            .and_then(Value::as_str)
        {
            node.ax.role = Some(role.to_string());
        }
        if let Some(properties) = ax_node.get("properties").and_then(Value::as_array) {
            for prop in properties {
                let name = prop.get("name").and_then(Value::as_str);
                let value = prop
                    .get("value")
                    .and_then(|v| v.get("value"))
                    .map(value_to_plain_string);
                if let (Some(name), Some(value)) = (name, value) {
                    if name == "scrollable" && value == "true" {
                        node.scrollable = true;
                    }
                    node.ax.properties.insert(name.to_string(), value);
                }
            }
        }
    }
}

fn value_to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Invariant: "exactly one root per target" — the forest has exactly one
/// parentless node.
fn find_root(nodes: &BTreeMap<BackendNodeId, EnhancedNode>) -> Result<BackendNodeId, SnapshotError> {
    let roots: Vec<BackendNodeId> = nodes
        .values()
        .filter(|n| n.parent.is_none())
        .map(|n| n.backend_node_id)
        .collect();
    match roots.as_slice() {
        [] => Err(SnapshotError::MissingRoot),
        [only] => Ok(*only),
        _ => {
            // Multiple documents can each contribute a parentless node
            // (iframes get their own document); the outermost document's
            // node is the one with the smallest backend-node-id, which CDP
            // assigns in document-traversal order starting from the root.
            Ok(*roots.iter().min().expect("non-empty"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_dom_snapshot() -> Value {
        json!({
            "strings": ["HTML", "BODY", "BUTTON", "id", "submit", "class", "btn primary"],
            "documents": [{
                "nodes": {
                    "parentIndex": [-1, 0, 1],
                    "nodeType": [9, 1, 1],
                    "backendNodeId": [1, 2, 3],
                    "nodeName": [0, 1, 2],
                    "nodeValue": [-1, -1, -1],
                    "attributes": [
                        [],
                        [],
                        [3, 4, 5, 6]
                    ],
                    "isClickable": { "index": [2], "value": [true] }
                },
                "layout": {
                    "nodeIndex": [1, 2],
                    "bounds": [0.0, 0.0, 800.0, 600.0, 100.0, 200.0, 80.0, 30.0],
                    "paintOrders": [1, 2]
                }
            }]
        })
    }

    fn sample_ax_snapshot() -> Value {
        json!({
            "nodes": [{
                "backendDOMNodeId": 3,
                "role": { "value": "button" },
                "properties": [
                    { "name": "focusable", "value": { "value": true } }
                ]
            }]
        })
    }

    #[test]
    fn parses_parent_child_links_and_root() {
        let nodes = parse_dom_forest(&sample_dom_snapshot()).expect("parse");
        assert_eq!(nodes.len(), 3);
        let root = find_root(&nodes).expect("root");
        assert_eq!(root, BackendNodeId(1));
        assert!(nodes[&BackendNodeId(1)].parent.is_none());
        assert_eq!(nodes[&BackendNodeId(1)].children, vec![BackendNodeId(2)]);
        assert_eq!(nodes[&BackendNodeId(2)].parent, Some(BackendNodeId(1)));
        assert_eq!(nodes[&BackendNodeId(3)].parent, Some(BackendNodeId(2)));
    }

    #[test]
    fn decodes_attributes_via_string_table() {
        let nodes = parse_dom_forest(&sample_dom_snapshot()).expect("parse");
        let button = &nodes[&BackendNodeId(3)];
        assert_eq!(button.attributes.get("id"), Some(&"submit".to_string()));
        assert_eq!(button.attributes.get("class"), Some(&"btn primary".to_string()));
    }

    #[test]
    fn decodes_layout_bounds_and_paint_order() {
        let nodes = parse_dom_forest(&sample_dom_snapshot()).expect("parse");
        let body = &nodes[&BackendNodeId(2)];
        let bounds = body.bounds.expect("bounds present");
        assert_eq!(bounds.width, 800.0);
        assert_eq!(body.paint_order, Some(1));

        let button = &nodes[&BackendNodeId(3)];
        assert!(button.ax.properties.get("clickable").is_some());
    }

    #[test]
    fn cross_links_ax_role_onto_matching_backend_node() {
        let mut nodes = parse_dom_forest(&sample_dom_snapshot()).expect("parse");
        apply_ax_tree(&sample_ax_snapshot(), &mut nodes);
        let button = &nodes[&BackendNodeId(3)];
        assert_eq!(button.ax.role.as_deref(), Some("button"));
        assert_eq!(button.ax.properties.get("focusable"), Some(&"true".to_string()));
    }

    #[test]
    fn rejects_snapshot_with_no_documents() {
        let err = parse_dom_forest(&json!({"strings": []})).unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedSnapshot(_)));
    }
}
