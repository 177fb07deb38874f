//! `click`, `input`, `scroll`, `select_dropdown`, `dropdown_options`,
//! `send_keys`, `upload_file` — everything addressed at a specific element
//! or at raw keyboard/page-scroll input.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use wayfarer_actions::{ActionCtx, ActionHandler};
use wayfarer_cdp::Cdp;
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, ErrorKind, WayfarerError};
use wayfarer_interact_primitives::keyboard::{backspace_key_event, delete_key_event, enter_key_event, key_event_for_char, modifiers, OwnedKeyEventSpec};
use wayfarer_interact_primitives::{ElementInteractor, ExecCtx, ScrollBehavior, ScrollTarget, SelectMethod, WaitTier};

use super::{optional_bool, required_str, resolve_index, ActionDeps};

fn exec_ctx(deps: &ActionDeps, ctx: &ActionCtx) -> ExecCtx {
    let _ = deps;
    ExecCtx::new(ctx.page, ctx.deadline, ctx.cancel.clone())
}

pub struct ClickHandler {
    deps: Arc<ActionDeps>,
}

impl ClickHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for ClickHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let node = resolve_index(&self.deps, params, "index")?;
        let exec_ctx = exec_ctx(&self.deps, ctx);
        self.deps.interactor.click(&exec_ctx, node, WaitTier::DomReady).await?;
        Ok(ActionResult::ok(format!("Clicked element {node}.")))
    }
}

pub struct InputHandler {
    deps: Arc<ActionDeps>,
}

impl InputHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for InputHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let node = resolve_index(&self.deps, params, "index")?;
        let text = required_str(params, "text")?;
        let clear = optional_bool(params, "clear");
        let submit = optional_bool(params, "submit");
        let exec_ctx = exec_ctx(&self.deps, ctx);
        self.deps.interactor.fill(&exec_ctx, node, text, clear, submit, WaitTier::DomReady).await?;
        Ok(ActionResult::ok(format!("Typed into element {node}.")))
    }
}

pub struct ScrollHandler {
    deps: Arc<ActionDeps>,
}

impl ScrollHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for ScrollHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let direction = required_str(params, "direction")?;
        let pages = params.get("pages").and_then(ParamValue::as_u64).unwrap_or(1).max(1) as i32;
        let exec_ctx = exec_ctx(&self.deps, ctx);

        if params.contains_key("index") {
            let node = resolve_index(&self.deps, params, "index")?;
            self.deps.interactor.scroll(&exec_ctx, &ScrollTarget::Element(node), ScrollBehavior::Smooth).await?;
            return Ok(ActionResult::ok(format!("Scrolled container {node} into view.")));
        }

        match direction {
            "up" | "down" => {
                let (_, viewport_height) = self.deps.cdp.viewport_size(ctx.page).await.map_err(WayfarerError::from)?;
                let magnitude = (viewport_height * pages as f64) as i32;
                let delta = if direction == "down" { magnitude } else { -magnitude };
                self.deps.interactor.scroll(&exec_ctx, &ScrollTarget::Pixels(delta), ScrollBehavior::Smooth).await?;
            }
            "left" | "right" => {
                let (viewport_width, _) = self.deps.cdp.viewport_size(ctx.page).await.map_err(WayfarerError::from)?;
                let magnitude = (viewport_width * pages as f64) as i32;
                let delta = if direction == "right" { magnitude } else { -magnitude };
                let script = format!("(() => {{ window.scrollBy({{ left: {delta}, top: 0, behavior: 'smooth' }}); return true; }})()");
                self.deps.cdp.evaluate_script(ctx.page, &script).await.map_err(WayfarerError::from)?;
            }
            other => {
                return Err(WayfarerError::new(ErrorKind::InvalidActionSchema, format!("unknown scroll direction \"{other}\"")));
            }
        }

        Ok(ActionResult::ok(format!("Scrolled {direction} by {pages} page(s).")))
    }
}

pub struct SelectDropdownHandler {
    deps: Arc<ActionDeps>,
}

impl SelectDropdownHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for SelectDropdownHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let node = resolve_index(&self.deps, params, "index")?;
        let value = required_str(params, "value")?;
        let exec_ctx = exec_ctx(&self.deps, ctx);
        self.deps.interactor.select(&exec_ctx, node, SelectMethod::Value, value, WaitTier::DomReady).await?;
        Ok(ActionResult::ok(format!("Selected \"{value}\" in dropdown {node}.")))
    }
}

pub struct DropdownOptionsHandler {
    deps: Arc<ActionDeps>,
}

impl DropdownOptionsHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

const LIST_OPTIONS_SCRIPT: &str = "function() {\n    return Array.from(this.options || []).map(o => ({ value: o.value, text: o.text, selected: o.selected }));\n}";

#[async_trait]
impl ActionHandler for DropdownOptionsHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let node = resolve_index(&self.deps, params, "index")?;
        let object_id = self.deps.cdp.resolve_backend_node(ctx.page, node).await.map_err(WayfarerError::from)?;
        let value = self
            .deps
            .cdp
            .call_function_on(ctx.page, &object_id, LIST_OPTIONS_SCRIPT, Vec::new())
            .await
            .map_err(WayfarerError::from)?;
        let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Ok(ActionResult {
            extracted_content: Some(rendered.clone()),
            long_term_memory: Some(format!("Options for dropdown {node}: {rendered}")),
            include_in_memory: true,
            ..Default::default()
        })
    }
}

pub struct SendKeysHandler {
    deps: Arc<ActionDeps>,
}

impl SendKeysHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

/// Resolves a key combo like `"Enter"` or `"Control+a"` into one dispatched
/// `keyDown`/`char`/`keyUp` sequence against whatever currently holds focus.
/// Named keys cover the handful a model is likely to ask for; anything else
/// falls through to single-character resolution.
fn resolve_key_combo(keys: &str) -> Result<OwnedKeyEventSpec, WayfarerError> {
    let mut mods = 0u8;
    let mut parts: Vec<&str> = keys.split('+').collect();
    let Some(last) = parts.pop() else {
        return Err(WayfarerError::new(ErrorKind::InvalidActionSchema, "empty key sequence"));
    };
    for part in parts {
        mods |= match part.to_ascii_lowercase().as_str() {
            "control" | "ctrl" => modifiers::CONTROL,
            "alt" => modifiers::ALT,
            "shift" => modifiers::SHIFT,
            "meta" | "cmd" | "command" => modifiers::META,
            other => return Err(WayfarerError::new(ErrorKind::InvalidActionSchema, format!("unknown modifier \"{other}\""))),
        };
    }

    let mut spec = named_key(last).unwrap_or_else(|| key_event_for_char(last.chars().next().unwrap_or('\u{0}')));
    spec.modifiers |= mods;
    Ok(spec)
}

fn named_key(name: &str) -> Option<OwnedKeyEventSpec> {
    let spec = match name {
        "Enter" | "Return" => enter_key_event(),
        "Backspace" => backspace_key_event(),
        "Delete" => delete_key_event(),
        "Tab" => wayfarer_interact_primitives::keyboard::KeyEventSpec { modifiers: 0, windows_virtual_key_code: 0x09, key: "Tab", code: "Tab" },
        "Escape" | "Esc" => wayfarer_interact_primitives::keyboard::KeyEventSpec { modifiers: 0, windows_virtual_key_code: 0x1B, key: "Escape", code: "Escape" },
        "ArrowUp" => wayfarer_interact_primitives::keyboard::KeyEventSpec { modifiers: 0, windows_virtual_key_code: 0x26, key: "ArrowUp", code: "ArrowUp" },
        "ArrowDown" => wayfarer_interact_primitives::keyboard::KeyEventSpec { modifiers: 0, windows_virtual_key_code: 0x28, key: "ArrowDown", code: "ArrowDown" },
        "ArrowLeft" => wayfarer_interact_primitives::keyboard::KeyEventSpec { modifiers: 0, windows_virtual_key_code: 0x25, key: "ArrowLeft", code: "ArrowLeft" },
        "ArrowRight" => wayfarer_interact_primitives::keyboard::KeyEventSpec { modifiers: 0, windows_virtual_key_code: 0x27, key: "ArrowRight", code: "ArrowRight" },
        "Space" => return Some(key_event_for_char(' ')),
        _ => return None,
    };
    Some(spec.into())
}

#[async_trait]
impl ActionHandler for SendKeysHandler {
    async fn execute(&self, ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let keys = required_str(params, "keys")?;
        let spec = resolve_key_combo(keys)?;
        let text = if spec.modifiers == 0 && spec.key.chars().count() == 1 { Some(spec.key.as_str()) } else { None };

        self.deps
            .cdp
            .dispatch_key_event(ctx.page, "keyDown", spec.modifiers, spec.windows_virtual_key_code, &spec.key, &spec.code, text)
            .await
            .map_err(WayfarerError::from)?;
        if let Some(text) = text {
            self.deps
                .cdp
                .dispatch_key_event(ctx.page, "char", spec.modifiers, spec.windows_virtual_key_code, &spec.key, &spec.code, Some(text))
                .await
                .map_err(WayfarerError::from)?;
        }
        self.deps
            .cdp
            .dispatch_key_event(ctx.page, "keyUp", spec.modifiers, spec.windows_virtual_key_code, &spec.key, &spec.code, None)
            .await
            .map_err(WayfarerError::from)?;

        Ok(ActionResult::ok(format!("Sent key sequence \"{keys}\".")))
    }
}

pub struct UploadFileHandler {
    deps: Arc<ActionDeps>,
}

impl UploadFileHandler {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl ActionHandler for UploadFileHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let _ = &self.deps;
        let path = required_str(params, "path")?;
        // Setting a file input's value requires `DOM.setFileInputFiles` against
        // a backend-node-id, which the current CDP surface doesn't expose
        // (see `Cdp`'s method list) — nothing short of JS can forge a
        // `FileList`, and browsers block exactly that for security. Recorded
        // as a known gap rather than silently no-opping.
        Err(WayfarerError::new(
            ErrorKind::InvalidActionSchema,
            format!("file upload is not supported by the current CDP surface (requested: {path})"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_key_combo_plain_letter_has_no_modifiers() {
        let spec = resolve_key_combo("a").unwrap();
        assert_eq!(spec.modifiers, 0);
        assert_eq!(spec.key, "a");
    }

    #[test]
    fn resolve_key_combo_named_key_is_case_sensitive() {
        let spec = resolve_key_combo("Enter").unwrap();
        assert_eq!(spec.key, "Enter");
        assert_eq!(spec.modifiers, 0);
    }

    #[test]
    fn resolve_key_combo_applies_single_modifier() {
        let spec = resolve_key_combo("Control+a").unwrap();
        assert_eq!(spec.modifiers, modifiers::CONTROL);
        assert_eq!(spec.key, "a");
    }

    #[test]
    fn resolve_key_combo_stacks_multiple_modifiers() {
        let spec = resolve_key_combo("Control+Shift+Tab").unwrap();
        assert_eq!(spec.modifiers, modifiers::CONTROL | modifiers::SHIFT);
        assert_eq!(spec.key, "Tab");
    }

    #[test]
    fn resolve_key_combo_accepts_modifier_aliases() {
        let ctrl = resolve_key_combo("Ctrl+c").unwrap();
        let cmd = resolve_key_combo("cmd+c").unwrap();
        assert_eq!(ctrl.modifiers, modifiers::CONTROL);
        assert_eq!(cmd.modifiers, modifiers::META);
    }

    #[test]
    fn resolve_key_combo_rejects_unknown_modifier() {
        let err = resolve_key_combo("Super+a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidActionSchema);
    }

    #[test]
    fn resolve_key_combo_rejects_empty_sequence() {
        let err = resolve_key_combo("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidActionSchema);
    }

    #[test]
    fn named_key_covers_arrow_keys() {
        assert_eq!(named_key("ArrowUp").unwrap().key, "ArrowUp");
        assert_eq!(named_key("ArrowDown").unwrap().key, "ArrowDown");
        assert_eq!(named_key("ArrowLeft").unwrap().key, "ArrowLeft");
        assert_eq!(named_key("ArrowRight").unwrap().key, "ArrowRight");
    }

    #[test]
    fn named_key_treats_escape_and_esc_as_aliases() {
        assert_eq!(named_key("Escape").unwrap().key, "Escape");
        assert_eq!(named_key("Esc").unwrap().key, "Escape");
    }

    #[test]
    fn named_key_returns_none_for_plain_characters() {
        assert!(named_key("a").is_none());
    }
}
