//! Target liveness, as seen by the session/target manager. Per-request,
//! per-status-code network bookkeeping lives in `wayfarer-cdp`'s own
//! activity tracker; this only records whether the target is still
//! responding and when it last did something.

use std::time::Instant;

#[derive(Clone, Debug)]
pub struct TargetHealth {
    pub alive: bool,
    pub last_activity: Option<Instant>,
}

impl Default for TargetHealth {
    fn default() -> Self {
        Self {
            alive: true,
            last_activity: None,
        }
    }
}

impl TargetHealth {
    pub fn mark_activity(&mut self) {
        self.alive = true;
        self.last_activity = Some(Instant::now());
    }

    pub fn mark_crashed(&mut self) {
        self.alive = false;
    }
}
