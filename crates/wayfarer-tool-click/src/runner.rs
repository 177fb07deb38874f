use std::time::Instant;

use tracing::instrument;
use wayfarer_cdp::PageId;
use wayfarer_core::{BackendNodeId, WayfarerError};
use wayfarer_interact_primitives::ElementInteractor;

use crate::errors::ClickError;
use crate::model::{
    ActionReport, ClickOpt, ClickParams, ExecCtx, PostSignals, PrecheckSnapshot, SelfHeal, WaitTier,
};
use crate::policy::ClickPolicyView;
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
    pub policy: &'a ClickPolicyView,
    /// Performs the actual geometry resolution and synthetic dispatch.
    pub interactor: &'a dyn ElementInteractor,
}

#[instrument(skip_all, fields(action = %ctx.action_id.0, button = ?params.button))]
pub async fn execute(ctx: &ExecCtx, mut params: ClickParams, opt: ClickOpt, deps: RuntimeDeps<'_>) -> Result<ActionReport, WayfarerError> {
    if !deps.policy.enabled {
        return Err(ClickError::Disabled.into());
    }
    if !deps.policy.allowed_buttons.contains(&params.button) {
        return Err(ClickError::ButtonNotAllowed.into());
    }
    if let Some((dx, dy)) = params.offset {
        if dx.abs() > deps.policy.max_offset_px || dy.abs() > deps.policy.max_offset_px {
            return Err(ClickError::OffsetOutOfRange.into());
        }
    }

    deps.events.emit_started(&ctx.action_id, params.backend_node_id).await;
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
            return Err(ClickError::Precheck("element not clickable".into()).into());
        }
    }

    report.precheck = Some(precheck.clone());
    if self_heal.is_some() {
        report.self_heal = self_heal.clone();
    }

    if let Some(tempo) = deps.tempo {
        let plan = tempo.prepare(ctx.page, params.backend_node_id).await?;
        tempo.apply(&plan).await?;
    }

    let wait_tier = if matches!(opt.wait, WaitTier::Auto) {
        deps.policy.wait_default
    } else {
        opt.wait
    };

    let interact_result = deps
        .interactor
        .click(&interact_ctx(ctx), params.backend_node_id, to_interact_tier(wait_tier))
        .await;

    let interact_report = match interact_result {
        Ok(inner) => inner,
        Err(err) => {
            let wayfarer_err: WayfarerError = err.into();
            deps.metrics.record_fail("click");
            report.error = Some(wayfarer_err.clone());
            deps.events.emit_finished(&ctx.action_id, &PostSignals::default(), false, Some(&wayfarer_err)).await;
            return Err(wayfarer_err);
        }
    };

    let post = collect_post(&deps, ctx.page, params.backend_node_id, &interact_report.post_signals).await?;
    report.post_signals = post.clone();
    report.ok = true;
    deps.metrics.record_ok(report.latency_ms);
    deps.events.emit_finished(&ctx.action_id, &post, true, None).await;
    Ok(report.finish(Instant::now()))
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
    interact_signals: &wayfarer_interact_primitives::PostSignals,
) -> Result<PostSignals, WayfarerError> {
    let dom = deps.struct_port.local_diff(page, node).await.unwrap_or_default();
    let net = deps.network.window_digest(page).await.unwrap_or_default();
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
    Ok(PostSignals::merge(dom, net, url, title))
}

fn precheck_event(snapshot: &PrecheckSnapshot) -> crate::ports::PrecheckEvent {
    crate::ports::PrecheckEvent {
        visible: snapshot.visible,
        clickable: snapshot.clickable,
        enabled: snapshot.enabled,
    }
}
