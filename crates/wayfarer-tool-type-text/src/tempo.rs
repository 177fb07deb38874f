use async_trait::async_trait;
use wayfarer_cdp::PageId;
use wayfarer_core::WayfarerError;

use crate::model::InputMode;
use crate::ports::{TempoPort, TypingPlan, TypingStep};

/// No-op tempo provider beyond the per-character `Natural` plan; real
/// implementations can introduce jitter and dwell delays here.
#[derive(Clone, Debug, Default)]
pub struct NullTempo;

#[async_trait]
impl TempoPort for NullTempo {
    async fn build_plan(&self, mode: InputMode, text: &str) -> Result<TypingPlan, WayfarerError> {
        match mode {
            InputMode::Natural => Ok(TypingPlan {
                steps: text
                    .chars()
                    .map(|ch| TypingStep { chunk: ch.to_string(), delay_ms: 50 })
                    .collect(),
            }),
            _ => Ok(TypingPlan { steps: Vec::new() }),
        }
    }

    async fn run_plan(&self, _page: PageId, _plan: &TypingPlan) -> Result<(), WayfarerError> {
        Ok(())
    }
}
