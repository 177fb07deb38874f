//! Wires the catalog's 21 action names to concrete handlers. Handlers share
//! one [`ActionDeps`] bundle rather than each opening their own CDP/target
//! handles.

mod done;
mod files;
mod interact;
mod navigation;
mod perception;
mod tabs;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use wayfarer_actions::ActionHandler;
use wayfarer_cdp::{CdpAdapter, PageId};
use wayfarer_core::action::ParamValue;
use wayfarer_core::{BackendNodeId, ErrorKind, SessionId, TargetId, WayfarerError};
use wayfarer_interact_primitives::{DefaultElementInteractor, DefaultWaitStrategy, WaitStrategy};
use wayfarer_serializer::SelectorMap;
use wayfarer_snapshot_hub::PerceptionHub;
use wayfarer_snapshot_visual::ScreenshotCapture;
use wayfarer_targets::TargetManagerImpl;

use crate::wiring::BrowserRuntime;

/// Everything a handler needs that isn't in its per-call `ActionCtx`/params:
/// the browser handles, the single session every subcommand drives one tab
/// tree under, and the shared selector-map handle an `index` parameter
/// resolves against.
pub struct ActionDeps {
    pub cdp: Arc<CdpAdapter>,
    pub targets: Arc<TargetManagerImpl>,
    pub hub: Arc<dyn PerceptionHub>,
    pub interactor: Arc<DefaultElementInteractor<CdpAdapter>>,
    pub screenshots: Arc<ScreenshotCapture<CdpAdapter>>,
    pub session: SessionId,
    pub selector_map: Arc<RwLock<Option<SelectorMap>>>,
}

/// Builds every handler and a lookup by name, ready for
/// `wayfarer_actions::build_registry`.
pub fn build_handlers(
    runtime: &BrowserRuntime,
    session: SessionId,
    selector_map: Arc<RwLock<Option<SelectorMap>>>,
) -> HashMap<String, Arc<dyn ActionHandler>> {
    let wait_strategy: Arc<dyn WaitStrategy> = Arc::new(DefaultWaitStrategy::new(Arc::clone(&runtime.cdp)));
    let interactor = Arc::new(DefaultElementInteractor::new(Arc::clone(&runtime.cdp), wait_strategy));
    let screenshots = Arc::new(ScreenshotCapture::new(Arc::clone(&runtime.cdp)));

    let deps = Arc::new(ActionDeps {
        cdp: Arc::clone(&runtime.cdp),
        targets: Arc::clone(&runtime.targets),
        hub: Arc::clone(&runtime.hub),
        interactor,
        screenshots,
        session,
        selector_map,
    });

    let mut handlers: HashMap<String, Arc<dyn ActionHandler>> = HashMap::new();
    handlers.insert("search".into(), Arc::new(navigation::SearchHandler::new(Arc::clone(&deps))));
    handlers.insert("navigate".into(), Arc::new(navigation::NavigateHandler::new(Arc::clone(&deps))));
    handlers.insert("go_back".into(), Arc::new(navigation::GoBackHandler::new(Arc::clone(&deps))));
    handlers.insert("wait".into(), Arc::new(navigation::WaitHandler));

    handlers.insert("click".into(), Arc::new(interact::ClickHandler::new(Arc::clone(&deps))));
    handlers.insert("input".into(), Arc::new(interact::InputHandler::new(Arc::clone(&deps))));
    handlers.insert("scroll".into(), Arc::new(interact::ScrollHandler::new(Arc::clone(&deps))));
    handlers.insert("select_dropdown".into(), Arc::new(interact::SelectDropdownHandler::new(Arc::clone(&deps))));
    handlers.insert("dropdown_options".into(), Arc::new(interact::DropdownOptionsHandler::new(Arc::clone(&deps))));
    handlers.insert("send_keys".into(), Arc::new(interact::SendKeysHandler::new(Arc::clone(&deps))));
    handlers.insert("upload_file".into(), Arc::new(interact::UploadFileHandler::new(Arc::clone(&deps))));

    handlers.insert("find_text".into(), Arc::new(perception::FindTextHandler::new(Arc::clone(&deps))));
    handlers.insert("screenshot".into(), Arc::new(perception::ScreenshotHandler::new(Arc::clone(&deps))));
    handlers.insert("evaluate".into(), Arc::new(perception::EvaluateHandler::new(Arc::clone(&deps))));
    handlers.insert("extract".into(), Arc::new(perception::ExtractHandler::new(Arc::clone(&deps))));

    handlers.insert("switch".into(), Arc::new(tabs::SwitchHandler::new(Arc::clone(&deps))));
    handlers.insert("close".into(), Arc::new(tabs::CloseHandler::new(Arc::clone(&deps))));

    handlers.insert("write_file".into(), Arc::new(files::WriteFileHandler));
    handlers.insert("read_file".into(), Arc::new(files::ReadFileHandler));
    handlers.insert("replace_file".into(), Arc::new(files::ReplaceFileHandler));

    handlers.insert("done".into(), done::DoneHandler::shared());

    handlers
}

pub(crate) fn required_u64(params: &BTreeMap<String, ParamValue>, key: &str) -> Result<u64, WayfarerError> {
    params
        .get(key)
        .and_then(ParamValue::as_u64)
        .ok_or_else(|| WayfarerError::new(ErrorKind::InvalidActionSchema, format!("missing integer parameter `{key}`")))
}

pub(crate) fn required_str<'a>(params: &'a BTreeMap<String, ParamValue>, key: &str) -> Result<&'a str, WayfarerError> {
    params
        .get(key)
        .and_then(ParamValue::as_str)
        .ok_or_else(|| WayfarerError::new(ErrorKind::InvalidActionSchema, format!("missing string parameter `{key}`")))
}

pub(crate) fn optional_bool(params: &BTreeMap<String, ParamValue>, key: &str) -> bool {
    params.get(key).and_then(ParamValue::as_bool).unwrap_or(false)
}

/// Resolves an `index` parameter against the most recently produced selector
/// map. Indices only stay valid for the step that produced them — a stale
/// map (or an index the current map never assigned) both surface as the same
/// "re-observe" error the model already knows how to recover from.
pub(crate) fn resolve_index(deps: &ActionDeps, params: &BTreeMap<String, ParamValue>, key: &str) -> Result<BackendNodeId, WayfarerError> {
    let index = required_u64(params, key)? as u32;
    let guard = deps.selector_map.read();
    guard
        .as_ref()
        .and_then(|map| map.get(&index))
        .copied()
        .ok_or_else(|| WayfarerError::element_not_found(index))
}

/// Finds the tab that currently owns `page` within the one session every
/// subcommand drives. Used by actions whose target is implicit ("close the
/// active tab") rather than an explicit index.
pub(crate) fn resolve_target_for_page(deps: &ActionDeps, page: PageId) -> Result<TargetId, WayfarerError> {
    deps.targets
        .list_targets(&deps.session)
        .into_iter()
        .find(|ctx| ctx.cdp_page == page)
        .map(|ctx| ctx.id)
        .ok_or_else(|| WayfarerError::new(ErrorKind::Navigation, "current tab is no longer tracked by this session"))
}

/// Resolves `index` into a tab within the session's tab list. The catalog
/// has no notion of stable tab ids the model can address directly, so tabs
/// are ordered by `last_active_at` — the same "most recently used" order a
/// person tabbing through open windows would expect, though it shifts as
/// tabs are used, unlike a fixed creation order.
pub(crate) fn resolve_target_by_index(deps: &ActionDeps, index: u32) -> Result<TargetId, WayfarerError> {
    let mut targets = deps.targets.list_targets(&deps.session);
    targets.sort_by_key(|ctx| ctx.last_active_at);
    targets
        .into_iter()
        .nth(index as usize)
        .map(|ctx| ctx.id)
        .ok_or_else(|| WayfarerError::new(ErrorKind::Navigation, format!("no tab at index {index}")))
}
