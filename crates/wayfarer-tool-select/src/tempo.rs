use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use wayfarer_cdp::PageId;
use wayfarer_core::{BackendNodeId, WayfarerError};

use crate::model::SelectMode;
use crate::ports::{TempoPlan, TempoPort};

/// No-op pacing plan; real implementations may introduce human-like delays
/// around opening and closing a dropdown.
#[derive(Clone, Debug, Default)]
pub struct NullTempo;

#[async_trait]
impl TempoPort for NullTempo {
    async fn plan(&self, _page: PageId, _node: BackendNodeId, _mode: SelectMode) -> Result<TempoPlan, WayfarerError> {
        Ok(TempoPlan::default())
    }

    async fn apply(&self, plan: &TempoPlan) -> Result<(), WayfarerError> {
        if plan.pre_delay_ms > 0 {
            sleep(Duration::from_millis(plan.pre_delay_ms)).await;
        }
        if plan.post_delay_ms > 0 {
            sleep(Duration::from_millis(plan.post_delay_ms)).await;
        }
        Ok(())
    }
}
