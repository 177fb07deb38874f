use async_trait::async_trait;
use wayfarer_cdp::PageId;
use wayfarer_core::{BackendNodeId, WayfarerError};

use crate::ports::{TempoPlan, TempoPort};

/// No-op tempo helper when stealth is disabled.
#[derive(Clone, Debug, Default)]
pub struct NullTempo;

#[async_trait]
impl TempoPort for NullTempo {
    async fn prepare(&self, _page: PageId, _node: BackendNodeId) -> Result<TempoPlan, WayfarerError> {
        Ok(TempoPlan::default())
    }

    async fn apply(&self, _plan: &TempoPlan) -> Result<(), WayfarerError> {
        Ok(())
    }
}
