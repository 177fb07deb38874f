use wayfarer_telemetry::guard::LabelMap;
use wayfarer_telemetry::metrics::{inc, observe};

use crate::ports::MetricsPort;

#[derive(Clone, Debug, Default)]
pub struct ClickMetrics;

fn labels() -> LabelMap {
    let mut labels = LabelMap::new();
    labels.insert("tool".to_string(), "click".to_string());
    labels
}

impl MetricsPort for ClickMetrics {
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
}
