//! `wayfarer replay <macro-id>` — dispatches a persisted macro's steps
//! through the action registry.
//!
//! Recorded `Click`/`Input`/`Submit` steps carry an [`ElementDescriptor`]
//! rather than a selector-map index, because the index a recorder saw no
//! longer means anything once the page is re-observed. Each such step is
//! resolved against the *current* listing by a substring-match heuristic
//! over the descriptor's fields — good enough for a stable page, but not a
//! real locator strategy; a page whose layout changed since recording may
//! resolve to the wrong element or none at all.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use wayfarer_actions::ActionCtx;
use wayfarer_core::action::ParamValue;
use wayfarer_core::{Action, TaskId};
use wayfarer_config::ConfigSnapshot;
use wayfarer_macro::{ElementDescriptor, MacroStore, StepKind, ValueSource};
use wayfarer_serializer::{SerializeOptions, Serializer};
use wayfarer_snapshot_hub::PerceptionOptions;

use crate::errors::ExitCode;
use crate::wiring::{build_action_registry, build_browser_runtime};

const LAUNCH_PROFILE: &str = "replay";

pub async fn cmd_replay(config: &ConfigSnapshot, macro_id: &str, macro_dir: &Path, start_url: &str) -> Result<ExitCode> {
    let store = MacroStore::new(macro_dir.to_path_buf());
    let recorded = store.load(macro_id).await.with_context(|| format!("loading macro \"{macro_id}\""))?;

    let runtime = build_browser_runtime(config);
    let (session, target) = runtime.targets.launch(LAUNCH_PROFILE).await.context("launching browser session")?;
    let nav_deadline = Duration::from_millis(config.agent.timeouts_ms.navigate);
    if start_url != "about:blank" {
        runtime.targets.navigate(target.clone(), start_url, false, nav_deadline).await.context("navigating to start URL")?;
    }

    let selector_map = Arc::new(RwLock::new(None));
    let registry = build_action_registry(&runtime, session, Arc::clone(&selector_map)).context("building action registry")?;
    let serializer = Serializer::new(SerializeOptions::default());

    let mut failures = 0usize;
    for step in &recorded.steps {
        let action = match &step.step {
            StepKind::Navigation { url } => Some(simple_action("navigate", [("url", ParamValue::String(url.clone()))])),
            StepKind::Wait { ms } => Some(simple_action("wait", [("ms", ParamValue::Number(*ms as f64))])),
            StepKind::Keypress { key } => Some(simple_action("send_keys", [("keys", ParamValue::String(key.clone()))])),
            StepKind::Scroll { direction, pages } => Some(simple_action(
                "scroll",
                [("direction", ParamValue::String(direction.clone())), ("pages", ParamValue::Number(*pages as f64))],
            )),
            StepKind::Click { element } => {
                resolve_index(&runtime, target.clone(), &serializer, &selector_map, config, element).await?.map(|index| {
                    simple_action("click", [("index", ParamValue::Number(index as f64))])
                })
            }
            StepKind::Submit { element } => {
                resolve_index(&runtime, target.clone(), &serializer, &selector_map, config, element).await?.map(|index| {
                    simple_action("input", [("index", ParamValue::Number(index as f64)), ("text", ParamValue::String(String::new())), ("submit", ParamValue::Bool(true))])
                })
            }
            StepKind::Input { element, value, submit } => {
                let text = match value {
                    ValueSource::Static { value } => value.clone(),
                    ValueSource::Prompt { .. } | ValueSource::Ai { .. } => {
                        tracing::warn!(step = %step.id, "skipping input step: value source needs a live operator or model, unsupported in replay");
                        continue;
                    }
                };
                resolve_index(&runtime, target.clone(), &serializer, &selector_map, config, element).await?.map(|index| {
                    simple_action(
                        "input",
                        [("index", ParamValue::Number(index as f64)), ("text", ParamValue::String(text)), ("submit", ParamValue::Bool(*submit))],
                    )
                })
            }
            StepKind::Conditional { description } => {
                tracing::warn!(step = %step.id, %description, "skipping conditional step: replay has no branch evaluator");
                continue;
            }
            StepKind::LoopStart { label } | StepKind::LoopEnd { label } => {
                tracing::debug!(step = %step.id, %label, "loop markers are not enforced during replay");
                continue;
            }
        };

        let Some(action) = action else {
            failures += 1;
            continue;
        };

        let target_ctx = runtime.targets.get_target(&target)?;
        let ctx = ActionCtx::new(TaskId::new(), target_ctx.cdp_page, Instant::now() + Duration::from_secs(30), CancellationToken::new());
        match registry.execute(&ctx, action).await {
            Ok(result) => tracing::info!(step = %step.id, memory = ?result.long_term_memory, "step executed"),
            Err(err) => {
                tracing::error!(step = %step.id, %err, "step failed");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        println!("replay finished with {failures} failed step(s)");
        Ok(ExitCode::TaskFailed)
    } else {
        println!("replay finished: {} step(s) executed", recorded.steps.len());
        Ok(ExitCode::Success)
    }
}

fn simple_action<const N: usize>(action_type: &str, params: [(&str, ParamValue); N]) -> Action {
    let map: BTreeMap<String, ParamValue> = params.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    Action::new(action_type, map)
}

async fn resolve_index(
    runtime: &crate::wiring::BrowserRuntime,
    target: wayfarer_core::TargetId,
    serializer: &Serializer,
    selector_map: &Arc<RwLock<Option<wayfarer_serializer::SelectorMap>>>,
    config: &ConfigSnapshot,
    descriptor: &ElementDescriptor,
) -> Result<Option<u32>> {
    let mut options = PerceptionOptions::default();
    options.capture_screenshot = false;
    options.timeout_secs = config.agent.timeouts_ms.navigate.max(5_000) / 1000;

    let snapshot = runtime.hub.perceive(target, options).await.map_err(|err| anyhow!("perceiving page: {err}"))?;
    let previous = selector_map.read().clone();
    let output = serializer.serialize(&snapshot.structural, previous.as_ref());
    *selector_map.write() = Some(output.selector_map.clone());

    Ok(find_matching_index(&output.listing, descriptor))
}

/// Scores each `[N]<tag ...>text</tag>` listing line against how many of the
/// descriptor's fields appear in it, returning the best-scoring index.
fn find_matching_index(listing: &str, descriptor: &ElementDescriptor) -> Option<u32> {
    let needles: Vec<&str> = [
        descriptor.id.as_deref(),
        descriptor.name.as_deref(),
        descriptor.class.as_deref(),
        descriptor.element_type.as_deref(),
        descriptor.placeholder.as_deref(),
        descriptor.label.as_deref(),
        descriptor.inner_text.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect();

    if needles.is_empty() {
        return None;
    }

    let mut best: Option<(u32, usize)> = None;
    for line in listing.lines() {
        let Some(rest) = line.strip_prefix('[') else { continue };
        let Some(close) = rest.find(']') else { continue };
        let Ok(index) = rest[..close].parse::<u32>() else { continue };
        let body = &rest[close + 1..];
        let lower = body.to_lowercase();

        if let Some(tag) = &descriptor.tag {
            if !lower.contains(&format!("<{}", tag.to_lowercase())) {
                continue;
            }
        }

        let score = needles.iter().filter(|needle| lower.contains(&needle.to_lowercase())).count();
        if score > 0 && best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(tag: Option<&str>, id: Option<&str>, inner_text: Option<&str>) -> ElementDescriptor {
        ElementDescriptor {
            tag: tag.map(String::from),
            id: id.map(String::from),
            class: None,
            name: None,
            element_type: None,
            placeholder: None,
            label: None,
            inner_text: inner_text.map(String::from),
        }
    }

    #[test]
    fn matches_element_by_id() {
        let listing = "[0]<div>header</div>\n[1]<button id=\"submit-btn\">Submit</button>\n[2]<a href=\"/\">home</a>";
        let found = find_matching_index(listing, &descriptor(Some("button"), Some("submit-btn"), None));
        assert_eq!(found, Some(1));
    }

    #[test]
    fn prefers_the_higher_scoring_line() {
        let listing = "[0]<button class=\"btn\">Cancel</button>\n[1]<button class=\"btn primary\">Save changes</button>";
        let found = find_matching_index(listing, &descriptor(Some("button"), None, Some("Save changes")));
        assert_eq!(found, Some(1));
    }

    #[test]
    fn tag_filter_excludes_non_matching_elements() {
        let listing = "[0]<span id=\"login\">Login</span>\n[1]<button id=\"login\">Login</button>";
        let found = find_matching_index(listing, &descriptor(Some("button"), Some("login"), None));
        assert_eq!(found, Some(1));
    }

    #[test]
    fn returns_none_when_nothing_matches() {
        let listing = "[0]<div>header</div>\n[1]<a href=\"/\">home</a>";
        let found = find_matching_index(listing, &descriptor(None, Some("nonexistent"), None));
        assert_eq!(found, None);
    }

    #[test]
    fn returns_none_for_empty_descriptor() {
        let listing = "[0]<div>header</div>";
        let found = find_matching_index(listing, &descriptor(None, None, None));
        assert_eq!(found, None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let listing = "[0]<BUTTON ID=\"Submit-Btn\">SUBMIT</BUTTON>";
        let found = find_matching_index(listing, &descriptor(Some("button"), Some("submit-btn"), None));
        assert_eq!(found, Some(0));
    }
}
