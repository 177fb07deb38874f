use std::time::Instant;

use wayfarer_cdp::PageId;
use wayfarer_core::WayfarerError;

use crate::model::WaitTier;
use crate::policy::TypeTimeouts;
use crate::ports::CdpPort;

/// Authored from scratch, grounded on `wayfarer-tool-click`'s `wait.rs` —
/// the retrieved teacher source declares this module in `lib.rs` but never
/// shipped the file.
pub async fn apply_wait(
    cdp: &dyn CdpPort,
    page: PageId,
    tier: WaitTier,
    timeouts: &TypeTimeouts,
) -> Result<(), WayfarerError> {
    match tier {
        WaitTier::None => Ok(()),
        WaitTier::Auto | WaitTier::DomReady => {
            let deadline = Instant::now() + timeouts.wait_for(tier);
            cdp.wait_dom_ready(page, deadline).await
        }
    }
}
