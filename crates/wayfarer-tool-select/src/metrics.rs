use wayfarer_telemetry::guard::LabelMap;
use wayfarer_telemetry::metrics::{inc, observe};

use crate::ports::MetricsPort;

#[derive(Clone, Debug, Default)]
pub struct SelectMetrics;

fn labels() -> LabelMap {
    let mut labels = LabelMap::new();
    labels.insert("tool".to_string(), "select".to_string());
    labels
}

impl MetricsPort for SelectMetrics {
    fn record_ok(&self, latency_ms: u128) {
        inc("wayfarer_actions_total", labels());
        observe("wayfarer_action_latency_ms", latency_ms.min(u64::MAX as u128) as u64, labels());
    }

    fn record_fail(&self, kind: &str) {
        let mut labels = labels();
        labels.insert("reason".to_string(), kind.to_string());
        inc("wayfarer_action_failures_total", labels);
    }

    fn record_precheck_failure(&self, field: &str) {
        let mut labels = labels();
        labels.insert("field".to_string(), field.to_string());
        inc("wayfarer_precheck_failures_total", labels);
    }

    fn record_self_heal(&self, success: bool) {
        let mut labels = labels();
        labels.insert("success".to_string(), success.to_string());
        inc("wayfarer_self_heal_total", labels);
    }

    fn record_mode(&self, mode: &str) {
        let mut labels = labels();
        labels.insert("mode".to_string(), mode.to_string());
        inc("wayfarer_select_mode_total", labels);
    }

    fn record_match_kind(&self, kind: &str) {
        let mut labels = labels();
        labels.insert("match_kind".to_string(), kind.to_string());
        inc("wayfarer_select_match_kind_total", labels);
    }
}
