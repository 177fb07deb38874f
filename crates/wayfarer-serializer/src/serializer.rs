//! The seven-step prune → classify → fold → paint-order occlusion →
//! containment filter → index assignment → textual listing algorithm
//! (spec §4.D), operating over `wayfarer-snapshot`'s `EnhancedNode` forest
//! rather than raw CDP JSON.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use tracing::debug;
use wayfarer_core::BackendNodeId;
use wayfarer_snapshot::{BoundingRect, EnhancedNode, Snapshot};

use crate::model::{SelectorMap, SerializeOptions, SerializeOutput, SerializeTimings, SimplifiedNode};

const NOISE_TAGS: &[&str] = &["style", "script", "head", "meta", "link", "title"];
const SVG_PRIMITIVES: &[&str] = &[
    "path", "rect", "g", "circle", "ellipse", "line", "polyline", "polygon", "use", "defs",
    "clippath", "mask", "pattern", "image", "text", "tspan",
];

const SEARCH_INDICATORS: &[&str] = &[
    "search", "magnify", "glass", "lookup", "find", "query", "searchbox",
];

const AX_TRUTHY_KEYS: &[&str] = &[
    "focusable",
    "editable",
    "settable",
    "checked",
    "expanded",
    "pressed",
    "selected",
    "required",
    "autocomplete",
    "keyshortcuts",
];

const INTERACTIVE_TAGS: &[&str] = &[
    "button", "input", "select", "textarea", "a", "details", "summary", "option", "optgroup",
];

const EVENT_ATTRS: &[&str] = &[
    "onclick",
    "onmousedown",
    "onmouseup",
    "onkeydown",
    "onkeyup",
    "tabindex",
];

const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "menuitem",
    "option",
    "radio",
    "checkbox",
    "tab",
    "textbox",
    "combobox",
    "slider",
    "spinbutton",
    "search",
    "searchbox",
];

const FORM_TAGS: &[&str] = &["input", "select", "textarea", "button"];

const LISTING_ATTRS: &[&str] = &[
    "id",
    "class",
    "type",
    "name",
    "value",
    "placeholder",
    "href",
    "title",
    "aria-label",
];

/// A `(tag, required role attribute)` pair that passes its bounding box down
/// to descendants for the containment filter.
const PROPAGATING_ANCESTORS: &[(&str, Option<&str>)] = &[
    ("a", None),
    ("button", None),
    ("div", Some("button")),
    ("div", Some("combobox")),
    ("span", Some("button")),
    ("span", Some("combobox")),
    ("input", Some("combobox")),
];

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "false" | "0")
}

fn ax_truthy(node: &EnhancedNode, key: &str) -> bool {
    node.ax
        .properties
        .get(key)
        .map(|v| is_truthy(v))
        .unwrap_or(false)
}

fn has_search_indicator(node: &EnhancedNode) -> bool {
    let haystacks = [
        node.attributes.get("class"),
        node.attributes.get("id"),
    ]
    .into_iter()
    .flatten()
    .map(|s| s.as_str())
    .chain(
        node.attributes
            .iter()
            .filter(|(k, _)| k.starts_with("data-"))
            .map(|(_, v)| v.as_str()),
    );

    for haystack in haystacks {
        let lower = haystack.to_ascii_lowercase();
        if SEARCH_INDICATORS.iter().any(|needle| lower.contains(needle)) {
            return true;
        }
    }
    false
}

fn is_icon_sized(bounds: Option<BoundingRect>) -> bool {
    match bounds {
        Some(b) => (10.0..=50.0).contains(&b.width) && (10.0..=50.0).contains(&b.height),
        None => false,
    }
}

fn rect_area(rect: &BoundingRect) -> f64 {
    rect.width.max(0.0) * rect.height.max(0.0)
}

fn rect_contained(inner: &BoundingRect, outer: &BoundingRect) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.x + inner.width <= outer.x + outer.width
        && inner.y + inner.height <= outer.y + outer.height
}

fn intersection_area(a: &BoundingRect, b: &BoundingRect) -> f64 {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = (a.x + a.width).min(b.x + b.width);
    let bottom = (a.y + a.height).min(b.y + b.height);
    (right - left).max(0.0) * (bottom - top).max(0.0)
}

fn is_transparent_background(color: Option<&str>) -> bool {
    let Some(color) = color else { return true };
    let color = color.trim().to_ascii_lowercase();
    if color == "transparent" || color.is_empty() {
        return true;
    }
    if let Some(rest) = color.strip_prefix("rgba(").and_then(|s| s.strip_suffix(')')) {
        if let Some(alpha) = rest.split(',').nth(3) {
            if let Ok(alpha) = alpha.trim().parse::<f64>() {
                return alpha <= 0.0;
            }
        }
    }
    false
}

fn is_propagating_ancestor(node: &EnhancedNode) -> bool {
    let tag = node.tag.as_str();
    PROPAGATING_ANCESTORS.iter().any(|(want_tag, want_role)| {
        if *want_tag != tag {
            return false;
        }
        match want_role {
            None => true,
            Some(role) => node
                .attributes
                .get("role")
                .map(|r| r.eq_ignore_ascii_case(role))
                .unwrap_or(false),
        }
    })
}

fn is_containment_exempt(node: &EnhancedNode) -> bool {
    FORM_TAGS.contains(&node.tag.as_str())
        || node.attributes.contains_key("onclick")
        || node.attributes.contains_key("aria-label")
}

/// The working tree surviving prune/classify/fold, before paint-order and
/// containment flags are attached.
struct WorkNode {
    id: BackendNodeId,
    depth: u32,
    children: Vec<WorkNode>,
}

pub struct Serializer {
    options: SerializeOptions,
}

impl Serializer {
    pub fn new(options: SerializeOptions) -> Self {
        Self { options }
    }

    pub fn serialize(&self, snapshot: &Snapshot, previous_map: Option<&SelectorMap>) -> SerializeOutput {
        let mut timings = SerializeTimings::default();

        let t0 = Instant::now();
        let mut interactive = BTreeMap::new();
        let folded = self.fold_node(snapshot, snapshot.root, 0, &mut interactive);
        timings.record("prune_classify_fold", t0.elapsed().as_micros() as u64);

        let t1 = Instant::now();
        let mut ignored_by_paint = HashSet::new();
        if let Some(ref root) = folded {
            if self.options.paint_order_filtering {
                self.apply_paint_order_occlusion(snapshot, root, &mut ignored_by_paint);
            }
        }
        timings.record("paint_order", t1.elapsed().as_micros() as u64);

        let t2 = Instant::now();
        let mut excluded_by_parent = HashSet::new();
        if let Some(ref root) = folded {
            if self.options.enable_bbox_filtering {
                self.apply_containment_filter(snapshot, root, None, &mut excluded_by_parent);
            }
        }
        timings.record("containment", t2.elapsed().as_micros() as u64);

        let t3 = Instant::now();
        let previously_seen: HashSet<BackendNodeId> = previous_map
            .map(|map| map.values().copied().collect())
            .unwrap_or_default();
        let mut selector_map = SelectorMap::new();
        let mut next_index = 1u32;
        let root = folded.map(|tree| {
            self.assign_and_build(
                snapshot,
                &tree,
                &interactive,
                &ignored_by_paint,
                &excluded_by_parent,
                previous_map.is_some(),
                &previously_seen,
                &mut selector_map,
                &mut next_index,
            )
        });
        timings.record("index_assignment", t3.elapsed().as_micros() as u64);

        let t4 = Instant::now();
        let listing = root
            .as_ref()
            .map(|n| self.render_listing(n))
            .unwrap_or_default();
        timings.record("textual_listing", t4.elapsed().as_micros() as u64);

        debug!(
            target: "wayfarer-serializer",
            indexed = selector_map.len(),
            total_us = timings.total_us(),
            "serialized interactive-element listing"
        );

        SerializeOutput {
            root,
            selector_map,
            listing,
            timings,
        }
    }

    /// Steps 1-3 combined: drop noise tags and SVG drawing primitives
    /// (recursing into shadow roots the same as regular children), classify
    /// each surviving node, and fold away subtrees with no interactive node.
    fn fold_node(
        &self,
        snapshot: &Snapshot,
        id: BackendNodeId,
        depth: u32,
        interactive: &mut BTreeMap<BackendNodeId, bool>,
    ) -> Option<WorkNode> {
        let node = snapshot.get(id)?;
        let tag = node.tag.to_ascii_lowercase();
        if NOISE_TAGS.contains(&tag.as_str()) || SVG_PRIMITIVES.contains(&tag.as_str()) {
            return None;
        }

        let mut kept_children = Vec::new();
        for child_id in node.children.iter().chain(node.shadow_root_children.iter()).copied() {
            if let Some(child) = self.fold_node(snapshot, child_id, depth + 1, interactive) {
                kept_children.push(child);
            }
        }

        let self_interactive = self.classify(node);
        interactive.insert(id, self_interactive);

        if !self_interactive && kept_children.is_empty() {
            return None;
        }

        Some(WorkNode {
            id,
            depth,
            children: kept_children,
        })
    }

    /// Step 2's priority-ordered classification. `html`/`body` are never
    /// interactive; AX `disabled`/`hidden` truthy overrides every positive
    /// match below it back to non-interactive.
    fn classify(&self, node: &EnhancedNode) -> bool {
        let tag = node.tag.to_ascii_lowercase();
        if tag == "html" || tag == "body" {
            return false;
        }

        let positive = self.classify_positive(node, &tag);
        if !positive {
            return false;
        }
        if ax_truthy(node, "disabled") || ax_truthy(node, "hidden") {
            return false;
        }
        true
    }

    fn classify_positive(&self, node: &EnhancedNode, tag: &str) -> bool {
        if tag == "iframe" {
            if let Some(b) = node.bounds {
                if b.width > 100.0 && b.height > 100.0 {
                    return true;
                }
            }
        }
        if has_search_indicator(node) {
            return true;
        }
        if AX_TRUTHY_KEYS.iter().any(|key| ax_truthy(node, key)) {
            return true;
        }
        if INTERACTIVE_TAGS.contains(&tag) {
            return true;
        }
        if EVENT_ATTRS.iter().any(|attr| node.attributes.contains_key(*attr)) {
            return true;
        }
        if let Some(role) = node.attributes.get("role") {
            if INTERACTIVE_ROLES.contains(&role.to_ascii_lowercase().as_str()) {
                return true;
            }
        }
        if let Some(role) = &node.ax.role {
            if INTERACTIVE_ROLES.contains(&role.to_ascii_lowercase().as_str()) {
                return true;
            }
        }
        if is_icon_sized(node.bounds)
            && (node.attributes.contains_key("class")
                || node.attributes.contains_key("role")
                || node.attributes.contains_key("onclick")
                || node.attributes.contains_key("data-action")
                || node.attributes.contains_key("aria-label"))
        {
            return true;
        }
        if node.computed_style.cursor.as_deref() == Some("pointer") {
            return true;
        }
        false
    }

    /// Step 4. A true polygon union of the painted region is approximated by
    /// containment against any single previously-accumulated opaque rect —
    /// this catches the common case (a modal or sticky header fully covering
    /// what's beneath) without tracking arbitrary clipped regions.
    fn apply_paint_order_occlusion(
        &self,
        snapshot: &Snapshot,
        root: &WorkNode,
        ignored: &mut HashSet<BackendNodeId>,
    ) {
        let mut doc_order = Vec::new();
        flatten_doc_order(root, &mut doc_order);

        let mut candidates: Vec<(usize, BackendNodeId, i64, BoundingRect)> = doc_order
            .iter()
            .enumerate()
            .filter_map(|(doc_index, id)| {
                let node = snapshot.get(*id)?;
                let paint_order = node.paint_order?;
                let bounds = node.bounds?;
                if rect_area(&bounds) <= 0.0 {
                    return None;
                }
                Some((doc_index, *id, paint_order, bounds))
            })
            .collect();

        candidates.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        let mut painted: Vec<BoundingRect> = Vec::new();
        for (_, id, _paint_order, rect) in candidates {
            let node = snapshot.get(id).expect("candidate came from snapshot");
            if painted.iter().any(|p| rect_contained(&rect, p)) {
                ignored.insert(id);
            }

            let opacity_ok = node
                .computed_style
                .opacity
                .as_ref()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(1.0)
                >= 0.8;
            let opaque_bg = !is_transparent_background(node.computed_style.background_color.as_deref());
            if opacity_ok && opaque_bg {
                painted.push(rect);
            }
        }
    }

    /// Step 5, walked top-down so each node sees its nearest propagating
    /// ancestor.
    fn apply_containment_filter(
        &self,
        snapshot: &Snapshot,
        node: &WorkNode,
        ancestor: Option<(BackendNodeId, BoundingRect)>,
        excluded: &mut HashSet<BackendNodeId>,
    ) {
        let enh = snapshot.get(node.id).expect("work node came from snapshot");

        if let Some((ancestor_id, ancestor_rect)) = ancestor {
            if ancestor_id != node.id && !is_containment_exempt(enh) {
                if let Some(bounds) = enh.bounds {
                    let area = rect_area(&bounds);
                    if area > 0.0 {
                        let fraction = intersection_area(&bounds, &ancestor_rect) / area;
                        if fraction >= self.options.containment_threshold {
                            excluded.insert(node.id);
                        }
                    }
                }
            }
        }

        let next_ancestor = if is_propagating_ancestor(enh) {
            enh.bounds.map(|b| (node.id, b)).or(ancestor)
        } else {
            ancestor
        };

        for child in &node.children {
            self.apply_containment_filter(snapshot, child, next_ancestor, excluded);
        }
    }

    /// Steps 6-7 combined: walk in document order assigning indices to
    /// eligible nodes while building the `SimplifiedNode` tree the listing
    /// renders from.
    #[allow(clippy::too_many_arguments)]
    fn assign_and_build(
        &self,
        snapshot: &Snapshot,
        node: &WorkNode,
        interactive: &BTreeMap<BackendNodeId, bool>,
        ignored_by_paint: &HashSet<BackendNodeId>,
        excluded_by_parent: &HashSet<BackendNodeId>,
        has_previous_map: bool,
        previously_seen: &HashSet<BackendNodeId>,
        selector_map: &mut SelectorMap,
        next_index: &mut u32,
    ) -> SimplifiedNode {
        let enh = snapshot.get(node.id).expect("work node came from snapshot");
        let is_interactive = interactive.get(&node.id).copied().unwrap_or(false);
        let ignored = ignored_by_paint.contains(&node.id);
        let excluded = excluded_by_parent.contains(&node.id);

        let index = if is_interactive && !ignored && !excluded {
            let i = *next_index;
            *next_index += 1;
            selector_map.insert(i, node.id);
            Some(i)
        } else {
            None
        };

        let is_new = index.is_some() && has_previous_map && !previously_seen.contains(&node.id);

        let attributes = LISTING_ATTRS
            .iter()
            .filter_map(|attr| enh.attributes.get(*attr).map(|v| (attr.to_string(), self.truncate(v))))
            .collect();

        let children = node
            .children
            .iter()
            .map(|child| {
                self.assign_and_build(
                    snapshot,
                    child,
                    interactive,
                    ignored_by_paint,
                    excluded_by_parent,
                    has_previous_map,
                    previously_seen,
                    selector_map,
                    next_index,
                )
            })
            .collect();

        SimplifiedNode {
            backend_node_id: node.id,
            tag: enh.tag.clone(),
            depth: node.depth,
            attributes,
            text: enh.text.as_deref().map(|t| self.truncate(t)),
            is_interactive,
            ignored_by_paint_order: ignored,
            excluded_by_parent: excluded,
            is_shadow_host: enh.is_shadow_host,
            scrollable: enh.scrollable,
            index,
            is_new,
            children,
        }
    }

    fn truncate(&self, text: &str) -> String {
        let trimmed = text.trim();
        let char_count = trimmed.chars().count();
        if char_count <= self.max_text_length() {
            trimmed.to_string()
        } else {
            let truncated: String = trimmed
                .chars()
                .take(self.max_text_length().saturating_sub(3))
                .collect();
            format!("{truncated}...")
        }
    }

    fn max_text_length(&self) -> usize {
        self.options.max_text_length
    }

    fn render_listing(&self, node: &SimplifiedNode) -> String {
        let mut lines = Vec::new();
        render_node(node, node.depth, &mut lines);
        lines.join("\n")
    }
}

fn flatten_doc_order(node: &WorkNode, out: &mut Vec<BackendNodeId>) {
    out.push(node.id);
    for child in &node.children {
        flatten_doc_order(child, out);
    }
}

fn render_node(node: &SimplifiedNode, base_depth: u32, lines: &mut Vec<String>) {
    let indent = "  ".repeat((node.depth - base_depth) as usize);
    let mut line = String::new();
    line.push_str(&indent);
    if node.is_new {
        line.push('*');
    }
    if let Some(index) = node.index {
        line.push_str(&format!("[{index}]"));
    }
    line.push('<');
    line.push_str(&node.tag);
    for (key, value) in &node.attributes {
        line.push_str(&format!(" {key}=\"{}\"", escape_html(value)));
    }
    line.push('>');
    if let Some(text) = &node.text {
        line.push_str(&escape_html(text));
    }
    line.push_str("</");
    line.push_str(&node.tag);
    line.push('>');
    if node.is_shadow_host {
        line.push_str(" |SHADOW|");
    }
    if node.scrollable {
        line.push_str(" |SCROLL|");
    }
    lines.push(line);

    for child in &node.children {
        render_node(child, base_depth, lines);
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use wayfarer_snapshot::{AxInfo, ComputedStyleSubset, ScrollPosition, Viewport};

    use super::*;

    struct Fixture {
        nodes: BTreeMap<BackendNodeId, EnhancedNode>,
    }

    impl Fixture {
        fn new() -> Self {
            Self { nodes: BTreeMap::new() }
        }

        fn node(&mut self, id: i64, tag: &str, parent: Option<i64>) -> BackendNodeId {
            let bid = BackendNodeId(id);
            let mut node = EnhancedNode::new(bid, tag, 1);
            node.parent = parent.map(BackendNodeId);
            if let Some(p) = parent {
                self.nodes.get_mut(&BackendNodeId(p)).unwrap().children.push(bid);
            }
            self.nodes.insert(bid, node);
            bid
        }

        fn with_attr(&mut self, id: i64, key: &str, value: &str) -> &mut Self {
            self.nodes.get_mut(&BackendNodeId(id)).unwrap().attributes.insert(key.to_string(), value.to_string());
            self
        }

        fn with_bounds(&mut self, id: i64, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
            self.nodes.get_mut(&BackendNodeId(id)).unwrap().bounds = Some(BoundingRect { x, y, width, height });
            self
        }

        fn with_paint_order(&mut self, id: i64, order: i64) -> &mut Self {
            self.nodes.get_mut(&BackendNodeId(id)).unwrap().paint_order = Some(order);
            self
        }

        fn with_style(&mut self, id: i64, opacity: Option<&str>, background: Option<&str>) -> &mut Self {
            let node = self.nodes.get_mut(&BackendNodeId(id)).unwrap();
            node.computed_style = ComputedStyleSubset {
                opacity: opacity.map(String::from),
                background_color: background.map(String::from),
                cursor: None,
            };
            self
        }

        fn with_ax_role(&mut self, id: i64, role: &str) -> &mut Self {
            self.nodes.get_mut(&BackendNodeId(id)).unwrap().ax = AxInfo {
                role: Some(role.to_string()),
                properties: BTreeMap::new(),
            };
            self
        }

        fn with_ax_property(&mut self, id: i64, key: &str, value: &str) -> &mut Self {
            self.nodes
                .get_mut(&BackendNodeId(id))
                .unwrap()
                .ax
                .properties
                .insert(key.to_string(), value.to_string());
            self
        }

        fn snapshot(self, root: i64) -> Snapshot {
            Snapshot {
                root: BackendNodeId(root),
                nodes: self.nodes,
                viewport: Viewport { width: 1280, height: 720 },
                scroll: ScrollPosition::default(),
                collected_at: Utc::now(),
                timings: Default::default(),
            }
        }
    }

    #[test]
    fn classifies_button_tag_as_interactive() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "button", Some(1));
        let snap = fx.snapshot(1);

        let serializer = Serializer::new(SerializeOptions::default());
        let out = serializer.serialize(&snap, None);

        assert_eq!(out.selector_map.len(), 1);
        assert_eq!(out.selector_map.get(&1), Some(&BackendNodeId(2)));
    }

    #[test]
    fn classifies_role_attribute_as_interactive() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "div", Some(1));
        fx.with_attr(2, "role", "checkbox");
        let snap = fx.snapshot(1);

        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);
        assert_eq!(out.selector_map.len(), 1);
    }

    #[test]
    fn disabled_ax_property_overrides_interactivity() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "button", Some(1));
        fx.with_ax_property(2, "disabled", "true");
        let snap = fx.snapshot(1);

        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);
        assert!(out.selector_map.is_empty());
    }

    #[test]
    fn icon_sized_node_needs_an_affordance_attribute() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        let plain = fx.node(2, "span", Some(1));
        fx.with_bounds(2, 0.0, 0.0, 24.0, 24.0);
        let _ = plain;
        let snap = fx.snapshot(1);

        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);
        assert!(out.selector_map.is_empty());

        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "span", Some(1));
        fx.with_bounds(2, 0.0, 0.0, 24.0, 24.0);
        fx.with_attr(2, "aria-label", "close");
        let snap = fx.snapshot(1);
        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);
        assert_eq!(out.selector_map.len(), 1);
    }

    #[test]
    fn non_interactive_leaf_is_folded_away() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "div", Some(1));
        fx.node(3, "span", Some(2));
        let snap = fx.snapshot(1);

        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);
        assert!(out.root.is_none());
        assert!(out.selector_map.is_empty());
    }

    #[test]
    fn noise_tags_are_pruned_before_classification() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "script", Some(1));
        fx.with_attr(2, "onclick", "doStuff()");
        let snap = fx.snapshot(1);

        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);
        assert!(out.root.is_none());
    }

    #[test]
    fn fully_covered_node_is_ignored_by_paint_order() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "button", Some(1));
        fx.with_bounds(2, 0.0, 0.0, 50.0, 50.0);
        fx.with_paint_order(2, 1);

        fx.node(3, "button", Some(1));
        fx.with_bounds(3, 0.0, 0.0, 200.0, 200.0);
        fx.with_paint_order(3, 2);
        fx.with_style(3, Some("1.0"), Some("rgb(255,255,255)"));

        let snap = fx.snapshot(1);
        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);

        assert_eq!(out.selector_map.len(), 1);
        assert_eq!(out.selector_map.get(&1), Some(&BackendNodeId(3)));
    }

    #[test]
    fn transparent_overlay_does_not_occlude() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "button", Some(1));
        fx.with_bounds(2, 0.0, 0.0, 50.0, 50.0);
        fx.with_paint_order(2, 1);

        fx.node(3, "div", Some(1));
        fx.with_bounds(3, 0.0, 0.0, 200.0, 200.0);
        fx.with_paint_order(3, 2);
        fx.with_attr(3, "onclick", "noop()");
        fx.with_style(3, Some("1.0"), Some("transparent"));

        let snap = fx.snapshot(1);
        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);

        assert_eq!(out.selector_map.len(), 2);
    }

    #[test]
    fn descendant_fully_inside_propagating_ancestor_is_excluded() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "a", Some(1));
        fx.with_bounds(2, 0.0, 0.0, 100.0, 100.0);
        fx.with_attr(2, "href", "/home");

        fx.node(3, "span", Some(2));
        fx.with_bounds(3, 10.0, 10.0, 20.0, 20.0);
        fx.with_ax_role(3, "button");

        let snap = fx.snapshot(1);
        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);

        assert_eq!(out.selector_map.len(), 1);
        assert_eq!(out.selector_map.get(&1), Some(&BackendNodeId(2)));
    }

    #[test]
    fn form_element_inside_ancestor_is_exempt_from_containment() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "div", Some(1));
        fx.with_attr(2, "role", "button");
        fx.with_bounds(2, 0.0, 0.0, 100.0, 100.0);

        fx.node(3, "input", Some(2));
        fx.with_bounds(3, 10.0, 10.0, 20.0, 20.0);

        let snap = fx.snapshot(1);
        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);

        assert_eq!(out.selector_map.len(), 2);
    }

    #[test]
    fn index_assignment_marks_new_nodes_against_previous_map() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "button", Some(1));
        fx.node(3, "button", Some(1));
        let snap = fx.snapshot(1);

        let mut previous = SelectorMap::new();
        previous.insert(1, BackendNodeId(2));

        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, Some(&previous));

        let root = out.root.expect("root retained");
        let new_flags: Vec<bool> = root.children.iter().map(|c| c.is_new).collect();
        assert_eq!(new_flags, vec![false, true]);
    }

    #[test]
    fn listing_renders_indent_markers_and_attributes() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        fx.node(2, "div", Some(1));
        fx.node(3, "button", Some(2));
        fx.with_attr(3, "aria-label", "Submit");

        let snap = fx.snapshot(1);
        let out = Serializer::new(SerializeOptions::default()).serialize(&snap, None);

        assert!(out.listing.contains("[1]<button aria-label=\"Submit\">"));
    }

    #[test]
    fn long_text_is_truncated_with_an_ellipsis() {
        let mut fx = Fixture::new();
        fx.node(1, "html", None);
        let id = fx.node(2, "button", Some(1));
        fx.nodes.get_mut(&id).unwrap().text = Some("x".repeat(200));

        let options = SerializeOptions {
            max_text_length: 10,
            ..SerializeOptions::default()
        };
        let snap = fx.snapshot(1);
        let out = Serializer::new(options).serialize(&snap, None);

        let root = out.root.expect("root retained");
        let button = &root.children[0];
        assert_eq!(button.text.as_deref(), Some("xxxxxxx..."));
    }
}
