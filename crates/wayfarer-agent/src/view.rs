//! Bridges an `AggregateSnapshot` + its serialised listing into the
//! composer's `BrowserStateView`, counting interactive elements by tag.

use wayfarer_composer::{PageStats, ScrollInfo};
use wayfarer_serializer::{SerializeOutput, SimplifiedNode};
use wayfarer_snapshot_hub::AggregateSnapshot;

pub fn derive_stats(serialized: &SerializeOutput) -> PageStats {
    let mut stats = PageStats::default();
    stats.interactive_count = serialized.selector_map.len();
    if let Some(root) = &serialized.root {
        count_tags(root, &mut stats);
    }
    stats
}

fn count_tags(node: &SimplifiedNode, stats: &mut PageStats) {
    if node.is_interactive && node.index.is_some() {
        match node.tag.as_str() {
            "a" => stats.links += 1,
            "input" | "textarea" | "select" => stats.inputs += 1,
            "button" => stats.buttons += 1,
            _ => {}
        }
    }
    if node.scrollable {
        stats.scroll_containers += 1;
    }
    for child in &node.children {
        count_tags(child, stats);
    }
}

/// `wayfarer-snapshot`'s `Snapshot` tracks scroll offset but not total page
/// height, so `total_height` falls back to the viewport height — the scroll
/// percentage this yields is best-effort, not exact.
pub fn derive_scroll(snapshot: &wayfarer_snapshot::Snapshot) -> ScrollInfo {
    ScrollInfo {
        pixels_from_top: snapshot.scroll.y.max(0.0) as u64,
        viewport_height: snapshot.viewport.height as u64,
        total_height: snapshot.viewport.height as u64,
    }
}

pub fn active_tab<'a>(snapshot: &'a AggregateSnapshot) -> (Option<&'a str>, Option<&'a str>) {
    snapshot
        .tabs
        .iter()
        .find(|tab| tab.active)
        .map(|tab| (tab.url.as_deref(), tab.title.as_deref()))
        .unwrap_or((None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use wayfarer_core::BackendNodeId;
    use wayfarer_serializer::SerializeTimings;

    fn node(tag: &str, index: Option<u32>, scrollable: bool, children: Vec<SimplifiedNode>) -> SimplifiedNode {
        SimplifiedNode {
            backend_node_id: BackendNodeId(1),
            tag: tag.to_string(),
            depth: 0,
            attributes: BTreeMap::new(),
            text: None,
            is_interactive: index.is_some(),
            ignored_by_paint_order: false,
            excluded_by_parent: false,
            is_shadow_host: false,
            scrollable,
            index,
            is_new: false,
            children,
        }
    }

    #[test]
    fn counts_links_inputs_and_buttons_by_tag() {
        let tree = node(
            "div",
            None,
            false,
            vec![
                node("a", Some(0), false, vec![]),
                node("button", Some(1), false, vec![]),
                node("input", Some(2), false, vec![]),
            ],
        );
        let mut selector_map = HashMap::new();
        selector_map.insert(0, BackendNodeId(1));
        selector_map.insert(1, BackendNodeId(2));
        selector_map.insert(2, BackendNodeId(3));
        let output = SerializeOutput {
            root: Some(tree),
            selector_map,
            listing: String::new(),
            timings: SerializeTimings::default(),
        };

        let stats = derive_stats(&output);
        assert_eq!(stats.links, 1);
        assert_eq!(stats.buttons, 1);
        assert_eq!(stats.inputs, 1);
        assert_eq!(stats.interactive_count, 3);
    }
}
