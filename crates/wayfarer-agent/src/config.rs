//! Agent loop tunables: iteration and per-step action budgets, perception
//! options, and the anti-oscillation window.

use std::time::Duration;

/// Configuration for one agent loop run.
#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// Hard cap on loop iterations. Default 100.
    pub max_iterations: u32,

    /// Max actions dispatched per step, clamped to 1..=20. Default 5.
    pub max_actions_per_step: u32,

    /// Whether to request a screenshot alongside the DOM snapshot each step.
    pub enable_vision: bool,

    /// Timeout budget for a `navigate` action.
    pub navigation_timeout_ms: u64,

    /// Timeout budget for an element-wait action.
    pub element_wait_timeout_ms: u64,

    /// Delay between keystrokes when typing.
    pub keystroke_delay_ms: u64,

    /// Advisory (non-enforced) wall-clock budget for a whole step.
    pub step_wall_clock_advisory_ms: u64,

    /// Window within which direction alternations count toward the
    /// anti-oscillation guard.
    pub oscillation_window: Duration,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_actions_per_step: 5,
            enable_vision: true,
            navigation_timeout_ms: 30_000,
            element_wait_timeout_ms: 5_000,
            keystroke_delay_ms: 18,
            step_wall_clock_advisory_ms: 180_000,
            oscillation_window: Duration::from_secs(6),
        }
    }
}

impl AgentLoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set `max_actions_per_step`, clamped to the 1..=20 contract.
    pub fn max_actions_per_step(mut self, count: u32) -> Self {
        self.max_actions_per_step = count.clamp(1, 20);
        self
    }

    pub fn max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn vision(mut self, enabled: bool) -> Self {
        self.enable_vision = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_documented_budgets() {
        let config = AgentLoopConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.max_actions_per_step, 5);
        assert!(config.enable_vision);
    }

    #[test]
    fn max_actions_per_step_is_clamped_to_the_contract() {
        assert_eq!(AgentLoopConfig::new().max_actions_per_step(0).max_actions_per_step, 1);
        assert_eq!(AgentLoopConfig::new().max_actions_per_step(500).max_actions_per_step, 20);
        assert_eq!(AgentLoopConfig::new().max_actions_per_step(12).max_actions_per_step, 12);
    }
}
