//! The 10-slot recent-action ring buffer the anti-oscillation guard reads.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const CAPACITY: usize = 10;

struct ActionRecord {
    direction: Option<String>,
    at: Instant,
}

/// Tracks the last 10 dispatched actions, recording a scroll direction for
/// `scroll` actions and nothing for everything else.
#[derive(Default)]
pub struct RecentActions {
    buf: VecDeque<ActionRecord>,
}

impl RecentActions {
    pub fn new() -> Self {
        Self { buf: VecDeque::with_capacity(CAPACITY) }
    }

    pub fn record(&mut self, direction: Option<String>) {
        if self.buf.len() == CAPACITY {
            self.buf.pop_front();
        }
        self.buf.push_back(ActionRecord { direction, at: Instant::now() });
    }

    /// Counts direction alternations across the recorded directions still
    /// inside `window`, followed by `pending` (the queue about to be
    /// dispatched) — the combined sequence is what the guard judges.
    pub fn alternations_with_pending(&self, pending: &[&str], window: Duration) -> usize {
        let now = Instant::now();
        let mut sequence: Vec<&str> = self
            .buf
            .iter()
            .filter(|r| now.duration_since(r.at) <= window)
            .filter_map(|r| r.direction.as_deref())
            .collect();
        sequence.extend_from_slice(pending);
        sequence.windows(2).filter(|pair| pair[0] != pair[1]).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_alternations_trip_the_guard() {
        let mut recent = RecentActions::new();
        recent.record(Some("down".to_string()));
        recent.record(Some("up".to_string()));
        let alternations = recent.alternations_with_pending(&["down"], Duration::from_secs(6));
        assert_eq!(alternations, 2);
    }

    #[test]
    fn a_single_direction_change_does_not_trip_the_guard() {
        let mut recent = RecentActions::new();
        recent.record(Some("down".to_string()));
        let alternations = recent.alternations_with_pending(&["up"], Duration::from_secs(6));
        assert_eq!(alternations, 1);
    }

    #[test]
    fn ring_buffer_drops_the_oldest_entry_past_capacity() {
        let mut recent = RecentActions::new();
        for _ in 0..15 {
            recent.record(Some("down".to_string()));
        }
        assert_eq!(recent.buf.len(), CAPACITY);
    }

    #[test]
    fn non_scroll_actions_do_not_enter_the_direction_sequence() {
        let mut recent = RecentActions::new();
        recent.record(None);
        recent.record(Some("down".to_string()));
        recent.record(None);
        let alternations = recent.alternations_with_pending(&["up"], Duration::from_secs(6));
        assert_eq!(alternations, 1);
    }
}
