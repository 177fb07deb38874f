//! Command parameter types exposed by the CDP adapter interface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Specification for a DOM query operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuerySpec {
    pub selector: String,
    pub scope: QueryScope,
}

/// Query scope determines which portion of the document the adapter should inspect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum QueryScope {
    Document,
    Frame(String),
}

/// A resolved point on screen, paired with the backend node it was resolved
/// from when the caller needs to re-validate occlusion after scrolling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anchor {
    pub backend_node_id: Option<u64>,
    pub x: f64,
    pub y: f64,
}

/// Wait gate definitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WaitGate {
    DomReady,
    NetworkQuiet { window_ms: u64, max_inflight: u32 },
    FrameStable { min_stable_ms: u64 },
}

/// Options for capturing screenshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreenshotOptions {
    pub clip: Option<ScreenshotClip>,
    pub format: ScreenshotFormat,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreenshotClip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ScreenshotFormat {
    Png,
    Jpeg { quality: Option<u8> },
}

/// Which option(s) to select in a `<select>` element, addressed by backend
/// node id rather than CSS selector so the caller can reuse an anchor it
/// already resolved via a prior query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectSpec {
    pub backend_node_id: u64,
    pub values: Vec<String>,
}

/// What `DOM.getDocument` / `DOMSnapshot.captureSnapshot` should include. The
/// collector (`wayfarer-snapshot`) decides what it needs; the transport just
/// forwards the flags to the protocol call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomSnapshotConfig {
    pub include_styles: bool,
    pub include_shadow_dom: bool,
    pub max_depth: Option<u32>,
}

impl Default for DomSnapshotConfig {
    fn default() -> Self {
        Self {
            include_styles: true,
            include_shadow_dom: true,
            max_depth: None,
        }
    }
}

/// Raw `DOM.getDocument`/`DOMSnapshot.captureSnapshot` payload, left
/// undecoded: the collector owns parsing this into an `EnhancedNode` tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomSnapshotResult {
    pub raw: Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AxSnapshotConfig {
    pub interesting_only: bool,
}

/// Raw `Accessibility.getFullAXTree` payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxSnapshotResult {
    pub raw: Value,
}
