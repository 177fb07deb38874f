use std::time::Instant;

use wayfarer_cdp::PageId;
use wayfarer_core::WayfarerError;

use crate::model::WaitTier;
use crate::policy::SelectTimeouts;
use crate::ports::CdpPort;

pub async fn apply_wait(cdp: &dyn CdpPort, page: PageId, tier: WaitTier, timeouts: &SelectTimeouts) -> Result<(), WayfarerError> {
    match tier {
        WaitTier::None => Ok(()),
        WaitTier::Auto | WaitTier::DomReady => {
            let deadline = Instant::now() + timeouts.wait_for(tier);
            cdp.wait_dom_ready(page, deadline).await
        }
    }
}
