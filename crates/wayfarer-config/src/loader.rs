//! Layered loading: built-in defaults, overlaid by an optional YAML file,
//! overlaid by `WAYFARER_CONFIG__*` environment variables, overlaid by a
//! `WAYFARER_CONFIG_CLI_OVERRIDES` env var the CLI populates from `--set`
//! flags. Each layer's touched paths are stamped with their
//! [`ConfigSource`](crate::model::ConfigSource) in `provenance`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::api::apply_override_to_snapshot;
use crate::defaults::default_snapshot;
use crate::errors::ConfigError;
use crate::model::{ConfigSnapshot, ConfigSource};

const ENV_PREFIX: &str = "WAYFARER_CONFIG__";
const ENV_JSON: &str = "WAYFARER_CONFIG_OVERRIDE_JSON";
const ENV_CLI_OVERRIDES: &str = "WAYFARER_CONFIG_CLI_OVERRIDES";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
    pub include_cli_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
            include_cli_env: true,
        }
    }
}

pub fn load_snapshot(path: Option<&Path>) -> Result<ConfigSnapshot, ConfigError> {
    let mut options = LoadOptions::default();
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    options.include_env = true;
    options.include_cli_env = true;
    load_snapshot_with_options(&options)
}

pub fn load_snapshot_with_options(options: &LoadOptions) -> Result<ConfigSnapshot, ConfigError> {
    let mut snapshot = default_snapshot();
    bootstrap_builtin_provenance(&mut snapshot)?;

    for path in &options.paths {
        if path.exists() {
            let overlay = overlays_from_file(path)?;
            apply_overlays(&mut snapshot, overlay)?;
        }
    }

    if options.include_env {
        let env_overlays = overlays_from_env()?;
        apply_overlays(&mut snapshot, env_overlays)?;
    }

    if options.include_cli_env {
        let cli_overlays = overlays_from_cli_env()?;
        apply_overlays(&mut snapshot, cli_overlays)?;
    }

    Ok(snapshot)
}

struct ConfigOverlay {
    path: String,
    value: Value,
    source: ConfigSource,
}

fn apply_overlays(snapshot: &mut ConfigSnapshot, overlays: Vec<ConfigOverlay>) -> Result<(), ConfigError> {
    for overlay in overlays {
        apply_override_to_snapshot(snapshot, &overlay.path, &overlay.value, overlay.source)?;
    }
    Ok(())
}

fn overlays_from_file(path: &Path) -> Result<Vec<ConfigOverlay>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| ConfigError::Invalid(format!("{}", err)))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| ConfigError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(json_value, None, ConfigSource::File))
}

fn overlays_from_env() -> Result<Vec<ConfigOverlay>, ConfigError> {
    let mut overlays = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            let value = parse_env_value(&raw);
            overlays.push(ConfigOverlay {
                path,
                value,
                source: ConfigSource::Env,
            });
        }
    }

    if let Ok(raw_json) = env::var(ENV_JSON) {
        if !raw_json.trim().is_empty() {
            let json_value: Value =
                serde_json::from_str(&raw_json).map_err(|err| ConfigError::Invalid(format!("{}", err)))?;
            overlays.extend(flatten_value(json_value, None, ConfigSource::Env));
        }
    }

    Ok(overlays)
}

fn overlays_from_cli_env() -> Result<Vec<ConfigOverlay>, ConfigError> {
    let mut overlays = Vec::new();
    if let Ok(raw) = env::var(ENV_CLI_OVERRIDES) {
        for token in raw.split(',') {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut parts = trimmed.splitn(2, '=');
            let path = parts.next().unwrap().trim();
            let value_raw = parts.next().unwrap_or("").trim();
            if path.is_empty() {
                continue;
            }
            let value = parse_env_value(value_raw);
            overlays.push(ConfigOverlay {
                path: path.to_string(),
                value,
                source: ConfigSource::Cli,
            });
        }
    }
    Ok(overlays)
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn flatten_value(value: Value, prefix: Option<String>, source: ConfigSource) -> Vec<ConfigOverlay> {
    match value {
        Value::Object(map) => {
            let mut result = Vec::new();
            for (key, value) in map {
                let key_segment = key.trim().to_ascii_lowercase();
                let next_prefix = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, key_segment),
                    _ => key_segment.clone(),
                };
                result.extend(flatten_value(value, Some(next_prefix), source));
            }
            result
        }
        other => {
            if let Some(prefix) = prefix {
                vec![ConfigOverlay {
                    path: prefix,
                    value: other,
                    source,
                }]
            } else {
                Vec::new()
            }
        }
    }
}

fn bootstrap_builtin_provenance(snapshot: &mut ConfigSnapshot) -> Result<(), ConfigError> {
    let mut overlays = Vec::new();
    overlays.extend(flatten_value(
        serde_json::to_value(&snapshot.agent).map_err(|err| ConfigError::Invalid(format!("{}", err)))?,
        Some("agent".into()),
        ConfigSource::Builtin,
    ));
    overlays.extend(flatten_value(
        serde_json::to_value(&snapshot.targets).map_err(|err| ConfigError::Invalid(format!("{}", err)))?,
        Some("targets".into()),
        ConfigSource::Builtin,
    ));
    overlays.extend(flatten_value(
        serde_json::to_value(&snapshot.features).map_err(|err| ConfigError::Invalid(format!("{}", err)))?,
        Some("features".into()),
        ConfigSource::Builtin,
    ));

    for overlay in overlays {
        snapshot.set_provenance(&overlay.path, overlay.source);
    }
    Ok(())
}
