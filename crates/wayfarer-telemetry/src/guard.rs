//! Label sanitisation for metrics and span attributes. No external privacy
//! crate: origins are reduced to their host, and anything shaped like an
//! email address is replaced with an opaque fingerprint before it reaches a
//! counter or gauge label.

use crate::policy::current_policy;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

pub type LabelMap = BTreeMap<String, String>;

fn host_only(origin: &str) -> String {
    url::Url::parse(origin)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| origin.to_string())
}

fn looks_like_email(value: &str) -> bool {
    value.contains('@') && value.split('@').count() == 2
}

fn fingerprint(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("redacted:{:x}", hasher.finish())
}

pub fn sanitize_labels(kv: LabelMap) -> LabelMap {
    let policy = current_policy();
    if !policy.pii_guard {
        return kv;
    }

    let mut sanitized: LabelMap = kv
        .into_iter()
        .map(|(k, v)| {
            let v = if k == "origin" && !policy.allow_origin_full {
                host_only(&v)
            } else if looks_like_email(&v) {
                fingerprint(&v)
            } else {
                v
            };
            (k, v)
        })
        .collect();

    if sanitized.len() > policy.series_limit {
        sanitized = sanitized.into_iter().take(policy.series_limit).collect();
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{set_policy, TelemetryPolicy};

    fn enable_guard() {
        let mut view = TelemetryPolicy::default();
        view.pii_guard = true;
        set_policy(view);
    }

    #[test]
    fn reduces_origin_to_host() {
        enable_guard();
        let mut labels = LabelMap::new();
        labels.insert("origin".into(), "https://example.com/path".into());
        let sanitized = sanitize_labels(labels);
        assert_eq!(sanitized.get("origin").unwrap(), "example.com");
    }

    #[test]
    fn redacts_email_like_values() {
        enable_guard();
        let mut labels = LabelMap::new();
        labels.insert("note".into(), "user@example.com".into());
        let sanitized = sanitize_labels(labels);
        let note = sanitized.get("note").unwrap();
        assert!(note.starts_with("redacted:"));
        assert!(!note.contains("user@example.com"));
    }
}
