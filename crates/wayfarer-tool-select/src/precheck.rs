use std::time::Instant;

use tracing::warn;
use wayfarer_cdp::PageId;
use wayfarer_core::{BackendNodeId, WayfarerError};

use crate::model::FieldSnapshot;
use crate::policy::SelectTimeouts;
use crate::ports::{CdpPort, StructPort};

pub async fn run_precheck(
    struct_port: &dyn StructPort,
    cdp: &dyn CdpPort,
    page: PageId,
    node: BackendNodeId,
    timeouts: &SelectTimeouts,
) -> Result<FieldSnapshot, WayfarerError> {
    let start = Instant::now();
    let mut visible = struct_port.is_visible(page, node).await?;
    if !visible {
        cdp.scroll_into_view(page, node).await?;
        visible = struct_port.is_visible(page, node).await?;
    }
    let clickable = struct_port.is_clickable(page, node).await?;
    let enabled = struct_port.is_enabled(page, node).await?;
    let readonly = struct_port.is_readonly(page, node).await?;

    if clickable {
        if let Err(err) = cdp.focus(page, node).await {
            warn!("select precheck focus failed: {}", err);
        }
    }

    if start.elapsed() > timeouts.precheck() {
        warn!("select precheck exceeded timeout");
    }

    Ok(FieldSnapshot { visible, clickable, enabled, readonly })
}
