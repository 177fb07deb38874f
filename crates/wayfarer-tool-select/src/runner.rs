use std::time::Instant;

use tracing::instrument;
use wayfarer_cdp::PageId;
use wayfarer_core::{BackendNodeId, WayfarerError};
use wayfarer_interact_primitives::ElementInteractor;

use crate::errors::SelectError;
use crate::model::{ActionReport, ExecCtx, FieldSnapshot, MatchKind, PostSignals, SelectMode, SelectOpt, SelectParams, SelectionDigest, SelfHeal, WaitTier};
use crate::policy::SelectPolicyView;
use crate::ports::{match_kind_label, CdpPort, EventsPort, HealRequest, LocatorPort, MetricsPort, NetworkPort, PostEventPayload, SelectionState, StructPort, TempoPort};
use crate::{precheck, redact, wait};

pub struct RuntimeDeps<'a> {
    pub cdp: &'a dyn CdpPort,
    pub struct_port: &'a dyn StructPort,
    pub network: &'a dyn NetworkPort,
    pub locator: Option<&'a dyn LocatorPort>,
    pub events: &'a dyn EventsPort,
    pub metrics: &'a dyn MetricsPort,
    pub tempo: Option<&'a dyn TempoPort>,
    pub policy: &'a SelectPolicyView,
    /// Performs the actual option resolution and dispatch.
    pub interactor: &'a dyn ElementInteractor,
}

#[instrument(skip_all, fields(action = %ctx.action_id.0, mode = ?params.mode, match_kind = ?params.match_kind))]
pub async fn execute(ctx: &ExecCtx, mut params: SelectParams, opt: SelectOpt, deps: RuntimeDeps<'_>) -> Result<ActionReport, WayfarerError> {
    if !deps.policy.enabled {
        return Err(SelectError::Disabled.into());
    }
    if !deps.policy.allowed_modes.contains(&params.mode) {
        return Err(SelectError::ModeNotAllowed.into());
    }
    validate_target(&params)?;

    deps.metrics.record_mode(mode_label(params.mode));
    deps.metrics.record_match_kind(match_kind_label(params.match_kind));
    deps.events.emit_started(&ctx.action_id, params.backend_node_id).await;
    let mut report = ActionReport::new(Instant::now());

    let (field, heal) = ensure_precheck(ctx, &mut params, &deps).await?;
    report.precheck = Some(field.clone());
    if let Some(heal) = heal {
        report.self_heal = Some(heal);
    }

    if field.readonly {
        deps.metrics.record_fail("readonly");
        return Err(SelectError::ReadOnly.into());
    }
    if !field.enabled {
        deps.metrics.record_precheck_failure("enabled");
        return Err(SelectError::DisabledField.into());
    }

    let before_state = deps.struct_port.selection_state(ctx.page, params.backend_node_id).await.ok();

    if let Some(tempo) = deps.tempo {
        let plan = tempo.plan(ctx.page, params.backend_node_id, params.mode).await?;
        tempo.apply(&plan).await?;
    }

    let wait_tier = if matches!(opt.wait, WaitTier::Auto) { deps.policy.wait_default } else { opt.wait };
    let method = params.match_kind.to_select_method();

    for item in params.items() {
        let result = deps
            .interactor
            .select(&interact_ctx(ctx), params.backend_node_id, method, &item, to_interact_tier(wait_tier))
            .await;
        if let Err(err) = result {
            let wayfarer_err: WayfarerError = err.into();
            deps.metrics.record_fail("select");
            report.error = Some(wayfarer_err.clone());
            deps.events
                .emit_finished(&ctx.action_id, &PostEventPayload::new(SelectionDigest::default()), false, Some(&wayfarer_err))
                .await;
            return Err(wayfarer_err);
        }
    }

    if let Err(err) = wait::apply_wait(deps.cdp, ctx.page, wait_tier, &deps.policy.timeouts).await {
        deps.metrics.record_fail("wait");
        report.error = Some(err.clone());
        deps.events
            .emit_finished(&ctx.action_id, &PostEventPayload::new(SelectionDigest::default()), false, Some(&err))
            .await;
        return Err(err);
    }

    let (post, after_state) = collect_post(&deps, ctx.page, params.backend_node_id, before_state).await?;
    validate_post_selection(&params, &after_state)?;
    report.post_signals = post.clone();
    report.ok = true;
    deps.metrics.record_ok(report.latency_ms);
    deps.events.emit_finished(&ctx.action_id, &PostEventPayload::new(post.selection.clone()), true, None).await;
    Ok(report.finish(Instant::now()))
}

async fn ensure_precheck(ctx: &ExecCtx, params: &mut SelectParams, deps: &RuntimeDeps<'_>) -> Result<(FieldSnapshot, Option<SelfHeal>), WayfarerError> {
    let field = precheck::run_precheck(deps.struct_port, deps.cdp, ctx.page, params.backend_node_id, &deps.policy.timeouts).await?;
    deps.events.emit_precheck(&ctx.action_id, &precheck_event(&field)).await;

    if field.visible && field.clickable {
        return Ok((field, None));
    }

    if !deps.policy.allow_self_heal {
        deps.metrics.record_precheck_failure("clickable");
        return Err(SelectError::Precheck("control not clickable".into()).into());
    }

    let Some(locator) = deps.locator else {
        deps.metrics.record_fail("heal-missing");
        return Err(SelectError::SelfHealUnavailable.into());
    };

    match try_heal(locator, ctx, params.backend_node_id, "precheck").await? {
        Some(new_node) => {
            deps.metrics.record_self_heal(true);
            params.backend_node_id = new_node;
            let heal_snapshot = precheck::run_precheck(deps.struct_port, deps.cdp, ctx.page, params.backend_node_id, &deps.policy.timeouts).await?;
            let heal = SelfHeal { attempted: true, reason: Some("precheck".into()), used_node: Some(new_node) };
            Ok((heal_snapshot, Some(heal)))
        }
        None => {
            deps.metrics.record_self_heal(false);
            Err(SelectError::Precheck("control not clickable".into()).into())
        }
    }
}

async fn try_heal(locator: &dyn LocatorPort, ctx: &ExecCtx, node: BackendNodeId, reason: &str) -> Result<Option<BackendNodeId>, WayfarerError> {
    let outcome = locator
        .try_once(HealRequest { action_id: ctx.action_id.clone(), page: ctx.page, primary: node, reason: reason.to_string() })
        .await?;
    Ok(outcome.used_node)
}

async fn collect_post(
    deps: &RuntimeDeps<'_>,
    page: PageId,
    node: BackendNodeId,
    before: Option<SelectionState>,
) -> Result<(PostSignals, SelectionState), WayfarerError> {
    let dom = deps.struct_port.local_diff(page, node).await.unwrap_or_default();
    let net = deps.network.window_digest(page).await.unwrap_or_default();
    let after_state = deps.struct_port.selection_state(page, node).await.unwrap_or_default();
    let selection = build_selection_digest(before.as_ref(), &after_state);
    let url = deps.cdp.current_url(page).await.ok().map(|u| redact::url(&u));
    let title = deps.cdp.current_title(page).await.ok().map(|t| redact::title(&t, 128));

    Ok((PostSignals { dom, net, selection, url, title }, after_state))
}

fn build_selection_digest(before: Option<&SelectionState>, after: &SelectionState) -> SelectionDigest {
    let changed = match before {
        Some(prev) => prev.selected_indices != after.selected_indices || prev.selected_values != after.selected_values,
        None => !after.selected_indices.is_empty(),
    };
    SelectionDigest {
        changed,
        selected_count: after.selected_indices.len(),
        selected_indices: after.selected_indices.clone(),
        selected_hash: redact::selection_hash(&after.selected_values),
    }
}

fn precheck_event(snapshot: &FieldSnapshot) -> crate::ports::PrecheckEvent {
    crate::ports::PrecheckEvent { visible: snapshot.visible, clickable: snapshot.clickable, enabled: snapshot.enabled, readonly: snapshot.readonly }
}

fn mode_label(mode: SelectMode) -> &'static str {
    match mode {
        SelectMode::Single => "single",
        SelectMode::Multiple => "multiple",
        SelectMode::Toggle => "toggle",
    }
}

fn to_interact_tier(tier: WaitTier) -> wayfarer_interact_primitives::WaitTier {
    match tier {
        WaitTier::None => wayfarer_interact_primitives::WaitTier::None,
        WaitTier::Auto | WaitTier::DomReady => wayfarer_interact_primitives::WaitTier::DomReady,
    }
}

fn interact_ctx(ctx: &ExecCtx) -> wayfarer_interact_primitives::ExecCtx {
    wayfarer_interact_primitives::ExecCtx::new(ctx.page, ctx.deadline, ctx.cancel.clone())
}

fn validate_target(params: &SelectParams) -> Result<(), WayfarerError> {
    match params.match_kind {
        MatchKind::Value | MatchKind::Label => {
            if params.item.trim().is_empty() {
                return Err(SelectError::InvalidTarget("empty item".into()).into());
            }
        }
        MatchKind::Index => {
            for item in params.items() {
                item.trim().parse::<u32>().map_err(|_| WayfarerError::from(SelectError::InvalidTarget("index must be a non-negative integer".into())))?;
            }
        }
    }
    Ok(())
}

fn validate_post_selection(params: &SelectParams, state: &SelectionState) -> Result<(), WayfarerError> {
    if matches!(params.mode, SelectMode::Toggle) {
        return Ok(());
    }
    match params.match_kind {
        MatchKind::Value => {
            for item in params.items() {
                if !state.selected_values.iter().any(|val| val == &item) {
                    return Err(SelectError::OptionMissing.into());
                }
            }
        }
        MatchKind::Index => {
            for item in params.items() {
                let idx = item.trim().parse::<u32>().map_err(|_| WayfarerError::from(SelectError::InvalidTarget("index must be a non-negative integer".into())))?;
                if !state.selected_indices.contains(&idx) {
                    return Err(SelectError::OptionMissing.into());
                }
            }
        }
        MatchKind::Label => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_changes_detected() {
        let before = SelectionState { selected_indices: vec![1], selected_values: vec!["foo".into()] };
        let after = SelectionState { selected_indices: vec![2], selected_values: vec!["bar".into()] };
        let digest = build_selection_digest(Some(&before), &after);
        assert!(digest.changed);
        assert_eq!(digest.selected_count, 1);
        assert_eq!(digest.selected_indices, vec![2]);
        assert!(digest.selected_hash.is_some());
    }

    #[test]
    fn validate_target_index_requires_numeric() {
        let mut params = SelectParams::new(BackendNodeId(1), "not-a-number".into());
        params.match_kind = MatchKind::Index;
        assert!(validate_target(&params).is_err());
        params.item = "3".into();
        assert!(validate_target(&params).is_ok());
    }

    #[test]
    fn validate_post_selection_value_checks_membership() {
        let mut params = SelectParams::new(BackendNodeId(1), "foo".into());
        params.match_kind = MatchKind::Value;
        let state_ok = SelectionState { selected_indices: vec![0], selected_values: vec!["foo".into()] };
        assert!(validate_post_selection(&params, &state_ok).is_ok());
        let state_missing = SelectionState { selected_indices: vec![0], selected_values: vec!["bar".into()] };
        assert!(validate_post_selection(&params, &state_missing).is_err());
    }

    #[test]
    fn multiple_mode_splits_items() {
        let mut params = SelectParams::new(BackendNodeId(1), "a, b ,c".into());
        params.mode = SelectMode::Multiple;
        assert_eq!(params.items(), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }
}
