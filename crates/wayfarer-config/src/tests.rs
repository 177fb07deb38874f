use crate::api::{ConfigCenter, InMemoryConfigCenter};
use crate::defaults::default_snapshot;
use crate::loader::load_snapshot;
use crate::model::RuntimeOverrideSpec;
use std::env;
use std::sync::{Arc, Mutex, OnceLock};

#[test]
fn default_snapshot_has_reasonable_limits() {
    let snapshot = default_snapshot();
    assert_eq!(snapshot.agent.limits.max_actions_per_step, 10);
    assert_eq!(snapshot.agent.retry.max_attempts, 1);
}

#[test]
fn load_snapshot_allows_file_override() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("wayfarer.yaml");
    std::fs::write(
        &file_path,
        r#"agent:
  limits:
    max_actions_per_step: 4
    max_steps: 20
    max_duration_secs: 100
  timeouts_ms:
    navigate: 1000
    click: 2000
    type_text: 2000
    wait: 3000
    screenshot: 4000
  retry:
    max_attempts: 2
    backoff_ms: 100
"#,
    )
    .unwrap();

    let snapshot = load_snapshot(Some(&file_path)).unwrap();
    assert_eq!(snapshot.agent.limits.max_actions_per_step, 4);
    assert_eq!(snapshot.agent.retry.max_attempts, 1);
}

#[tokio::test]
async fn override_updates_snapshot() {
    let center = InMemoryConfigCenter::new(default_snapshot());
    let spec = RuntimeOverrideSpec {
        path: "agent.limits.max_actions_per_step".into(),
        value: serde_json::json!(4),
        owner: "test".into(),
        reason: "unit test".into(),
        ttl_seconds: 0,
    };
    ConfigCenter::apply_override(&center, spec).await.unwrap();
    let snapshot = ConfigCenter::snapshot(&center).await;
    assert_eq!(snapshot.agent.limits.max_actions_per_step, 4);
}

#[tokio::test]
async fn subscribe_streams_updates() {
    let center = InMemoryConfigCenter::new(default_snapshot());
    let mut rx = ConfigCenter::subscribe(&center);
    let original_rev = rx.borrow().rev;

    let spec = RuntimeOverrideSpec {
        path: "targets.health_probe_interval_ms".into(),
        value: serde_json::json!(2500),
        owner: "test".into(),
        reason: "unit test".into(),
        ttl_seconds: 0,
    };
    ConfigCenter::apply_override(&center, spec).await.unwrap();
    rx.changed().await.unwrap();
    let snapshot = Arc::clone(&rx.borrow());
    assert_ne!((*snapshot).rev, original_rev);
    assert_eq!((*snapshot).targets.health_probe_interval_ms, 2500);
}

#[tokio::test]
async fn guard_provides_sticky_view() {
    let center = InMemoryConfigCenter::new(default_snapshot());
    let guard = center.guard().await;
    let snapshot = guard.snapshot();
    assert_eq!(guard.revision(), snapshot.rev);
}

#[test]
fn env_cascade_prefers_stricter_value() {
    let _guard = env_guard().lock().unwrap();
    let key = "WAYFARER_CONFIG__AGENT__LIMITS__MAX_ACTIONS_PER_STEP";
    env::set_var(key, "4");
    let snapshot = load_snapshot(None).expect("load snapshot");
    env::remove_var(key);
    assert_eq!(snapshot.agent.limits.max_actions_per_step, 4);
    assert_eq!(
        snapshot
            .provenance
            .get("agent.limits.max_actions_per_step")
            .expect("provenance")
            .source,
        crate::model::ConfigSource::Env
    );
}

#[test]
fn cli_overrides_replace_and_record_provenance() {
    let _guard = env_guard().lock().unwrap();
    env::set_var(
        "WAYFARER_CONFIG_CLI_OVERRIDES",
        "features.vision_enabled=true,agent.retry.max_attempts=3",
    );
    let snapshot = load_snapshot(None).expect("load snapshot with cli");
    env::remove_var("WAYFARER_CONFIG_CLI_OVERRIDES");
    assert!(snapshot.features.vision_enabled);
    assert_eq!(snapshot.agent.retry.max_attempts, 3);
    assert_eq!(
        snapshot.provenance.get("features.vision_enabled").unwrap().source,
        crate::model::ConfigSource::Cli
    );
}

fn env_guard() -> &'static Mutex<()> {
    static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_GUARD.get_or_init(|| Mutex::new(()))
}
