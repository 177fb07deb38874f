//! Built-in waiting mechanisms shared by every primitive (spec §4.E "short
//! wait for layout to settle").

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use wayfarer_cdp::{Cdp, PageId, WaitGate};

use crate::{errors::InteractError, types::WaitTier};

#[async_trait]
pub trait WaitStrategy: Send + Sync {
    async fn wait(&self, page: PageId, tier: WaitTier) -> Result<(), InteractError>;
}

pub struct DefaultWaitStrategy<C>
where
    C: Cdp + Send + Sync,
{
    cdp: Arc<C>,
    pub domready_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub network_quiet_ms: u64,
}

impl<C> DefaultWaitStrategy<C>
where
    C: Cdp + Send + Sync,
{
    pub fn new(cdp: Arc<C>) -> Self {
        Self {
            cdp,
            domready_timeout_ms: 5_000,
            idle_timeout_ms: 10_000,
            network_quiet_ms: 500,
        }
    }

    async fn wait_domready(&self, page: PageId) -> Result<(), InteractError> {
        self.exec_wait_gate(
            page,
            WaitGate::DomReady,
            Duration::from_millis(self.domready_timeout_ms),
        )
        .await
    }

    async fn wait_idle(&self, page: PageId) -> Result<(), InteractError> {
        self.wait_domready(page).await?;
        self.exec_wait_gate(
            page,
            WaitGate::NetworkQuiet {
                window_ms: self.network_quiet_ms,
                max_inflight: 0,
            },
            Duration::from_millis(self.idle_timeout_ms),
        )
        .await
    }

    async fn exec_wait_gate(
        &self,
        page: PageId,
        gate: WaitGate,
        timeout: Duration,
    ) -> Result<(), InteractError> {
        let gate_json = serde_json::to_string(&gate)
            .map_err(|err| InteractError::internal(format!("failed to serialize wait gate: {err}")))?;

        self.cdp.wait_basic(page, gate_json, timeout).await.map_err(|err| {
            warn!(target: "wayfarer-interact-primitives", ?gate, %err, "wait gate failed");
            InteractError::Cdp(err)
        })
    }
}

#[async_trait]
impl<C> WaitStrategy for DefaultWaitStrategy<C>
where
    C: Cdp + Send + Sync,
{
    async fn wait(&self, page: PageId, tier: WaitTier) -> Result<(), InteractError> {
        match tier {
            WaitTier::None => {
                debug!(target: "wayfarer-interact-primitives", "WaitTier::None - no waiting");
                Ok(())
            }
            WaitTier::DomReady => self.wait_domready(page).await,
            WaitTier::Idle => self.wait_idle(page).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_tier_default_is_domready() {
        assert_eq!(WaitTier::default(), WaitTier::DomReady);
    }
}
