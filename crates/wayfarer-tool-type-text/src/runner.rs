use std::time::Instant;

use tracing::instrument;
use wayfarer_cdp::PageId;
use wayfarer_core::{BackendNodeId, WayfarerError};
use wayfarer_interact_primitives::ElementInteractor;

use crate::errors::TypeTextError;
use crate::model::{ActionReport, ExecCtx, InputMode, PostSignals, SelfHeal, TextOpt, TextParams, WaitTier};
use crate::policy::TypePolicyView;
use crate::ports::{CdpPort, EventsPort, HealRequest, LocatorPort, MetricsPort, NetworkPort, StructPort, TempoPort};
use crate::{precheck, redact};

pub struct RuntimeDeps<'a> {
    pub cdp: &'a dyn CdpPort,
    pub struct_port: &'a dyn StructPort,
    pub network: &'a dyn NetworkPort,
    pub locator: Option<&'a dyn LocatorPort>,
    pub events: &'a dyn EventsPort,
    pub metrics: &'a dyn MetricsPort,
    pub tempo: Option<&'a dyn TempoPort>,
    pub policy: &'a TypePolicyView,
    /// Performs the actual field-value entry and synthetic dispatch.
    pub interactor: &'a dyn ElementInteractor,
}

#[instrument(skip_all, fields(action = %ctx.action_id.0, mode = ?params.mode))]
pub async fn execute(ctx: &ExecCtx, mut params: TextParams, opt: TextOpt, deps: RuntimeDeps<'_>) -> Result<ActionReport, WayfarerError> {
    if !deps.policy.enabled {
        return Err(TypeTextError::Disabled.into());
    }
    if params.text.len() > deps.policy.max_text_len {
        return Err(TypeTextError::TextTooLong(deps.policy.max_text_len).into());
    }
    if matches!(params.mode, InputMode::Paste) && !deps.policy.allow_paste {
        return Err(TypeTextError::PasteDenied.into());
    }

    deps.events.emit_started(&ctx.action_id, params.backend_node_id).await;
    deps.metrics.record_mode(mode_label(params.mode));
    let mut report = ActionReport::new(Instant::now());

    let precheck = precheck::run_precheck(deps.struct_port, deps.cdp, ctx.page, params.backend_node_id, &deps.policy.timeouts).await?;
    deps.events.emit_precheck(&ctx.action_id, &precheck_event(&precheck)).await;

    let mut self_heal = None;
    if !precheck.visible || !precheck.clickable {
        if deps.policy.allow_self_heal {
            if let Some(locator) = deps.locator {
                if let Some(new_node) = try_heal(locator, ctx, params.backend_node_id, "auto-precheck").await? {
                    deps.metrics.record_self_heal(true);
                    self_heal = Some(SelfHeal {
                        attempted: true,
                        reason: Some("auto-precheck".into()),
                        used_node: Some(new_node),
                    });
                    params.backend_node_id = new_node;
                } else {
                    deps.metrics.record_self_heal(false);
                    self_heal = Some(SelfHeal {
                        attempted: true,
                        reason: Some("auto-precheck".into()),
                        used_node: None,
                    });
                }
            }
        } else {
            deps.metrics.record_precheck_failure("clickable");
            return Err(TypeTextError::Precheck("field not clickable".into()).into());
        }
    }
    if precheck.readonly {
        deps.metrics.record_precheck_failure("readonly");
        return Err(TypeTextError::ReadOnly.into());
    }
    if !precheck.enabled {
        deps.metrics.record_precheck_failure("enabled");
        return Err(TypeTextError::DisabledField.into());
    }
    if let Some(maxlength) = precheck.maxlength {
        if params.text.len() as u32 > maxlength {
            return Err(TypeTextError::TextTooLong(maxlength as usize).into());
        }
    }

    report.precheck = Some(precheck.clone());
    if self_heal.is_some() {
        report.self_heal = self_heal.clone();
    }

    if matches!(params.mode, InputMode::Natural) {
        if let Some(tempo) = deps.tempo {
            let plan = tempo.build_plan(params.mode, &params.text).await?;
            tempo.run_plan(ctx.page, &plan).await?;
        }
    }

    let wait_tier = if matches!(opt.wait, WaitTier::Auto) {
        deps.policy.wait_default
    } else {
        opt.wait
    };

    let interact_result = deps
        .interactor
        .fill(
            &interact_ctx(ctx),
            params.backend_node_id,
            &params.text,
            params.clear.enabled,
            params.submit,
            to_interact_tier(wait_tier),
        )
        .await;

    let interact_report = match interact_result {
        Ok(inner) => inner,
        Err(err) => {
            let wayfarer_err: WayfarerError = err.into();
            deps.metrics.record_fail("type_text");
            report.error = Some(wayfarer_err.clone());
            deps.events.emit_finished(&ctx.action_id, &PostSignals::default(), false, Some(&wayfarer_err)).await;
            return Err(wayfarer_err);
        }
    };

    let post = collect_post(&deps, ctx.page, params.backend_node_id, precheck.password_like, &interact_report.post_signals).await?;
    report.post_signals = post.clone();
    report.ok = true;
    deps.metrics.record_ok(report.latency_ms);
    deps.events.emit_finished(&ctx.action_id, &post, true, None).await;
    Ok(report.finish(Instant::now()))
}

fn mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Character => "character",
        InputMode::Instant => "instant",
        InputMode::Natural => "natural",
        InputMode::Paste => "paste",
    }
}

/// Translates this crate's policy-facing `WaitTier::Auto` into
/// `wayfarer_interact_primitives`'s tier, which has no "resolve at runtime"
/// variant of its own.
fn to_interact_tier(tier: WaitTier) -> wayfarer_interact_primitives::WaitTier {
    match tier {
        WaitTier::None => wayfarer_interact_primitives::WaitTier::None,
        WaitTier::Auto | WaitTier::DomReady => wayfarer_interact_primitives::WaitTier::DomReady,
    }
}

fn interact_ctx(ctx: &ExecCtx) -> wayfarer_interact_primitives::ExecCtx {
    wayfarer_interact_primitives::ExecCtx::new(ctx.page, ctx.deadline, ctx.cancel.clone())
}

async fn try_heal(locator: &dyn LocatorPort, ctx: &ExecCtx, node: BackendNodeId, reason: &str) -> Result<Option<BackendNodeId>, WayfarerError> {
    let outcome = locator
        .try_once(HealRequest {
            action_id: ctx.action_id.clone(),
            page: ctx.page,
            primary: node,
            reason: reason.to_string(),
        })
        .await?;
    Ok(outcome.used_node)
}

async fn collect_post(
    deps: &RuntimeDeps<'_>,
    page: PageId,
    node: BackendNodeId,
    password_like: bool,
    interact_signals: &wayfarer_interact_primitives::PostSignals,
) -> Result<PostSignals, WayfarerError> {
    let dom = deps.struct_port.local_diff(page, node).await.unwrap_or_default();
    let net = deps.network.window_digest(page).await.unwrap_or_default();
    let mut value = deps.network.value_digest(page, node).await.unwrap_or_default();
    if password_like {
        value.hash_after = None;
    }
    let url = interact_signals
        .url_after
        .clone()
        .or(deps.cdp.current_url(page).await.ok())
        .map(|u| redact::url(&u));
    let title = interact_signals
        .title_after
        .clone()
        .or(deps.cdp.current_title(page).await.ok())
        .map(|t| redact::title(&t, 128));
    Ok(PostSignals { dom, net, value, url, title })
}

fn precheck_event(snapshot: &crate::model::FieldSnapshot) -> crate::ports::PrecheckEvent {
    crate::ports::PrecheckEvent {
        visible: snapshot.visible,
        clickable: snapshot.clickable,
        enabled: snapshot.enabled,
        readonly: snapshot.readonly,
    }
}
