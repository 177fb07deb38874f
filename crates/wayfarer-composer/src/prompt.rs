//! Builds the system prompt from the action registry's own metadata, so
//! prompt and dispatch can never drift apart — every manifest change is
//! automatically reflected the next time the prompt is assembled.

use wayfarer_actions::{ActionManifest, ParamType};

const PREAMBLE: &str = r#"You are a browser automation agent. Each step you receive the current
browser state — URL, title, scroll position, and an indexed listing of
interactive elements — plus a record of what you did on previous steps.
Decide the next action(s) to take.

Elements are shown with an index in brackets, e.g. `[3]<button>Submit</button>`.
Only elements carrying an index are interactive; indices are only valid for the
listing they came from and may change after the page updates.

Respond with JSON: `{"thinking": "...", "action": {...}}` for a single action,
or `{"thinking": "...", "actions": [{...}, ...]}` for several. Each action
object has an `"action"` field naming one of the actions below plus that
action's own parameters."#;

/// Renders one manifest as a short reference entry: name, description, and
/// each parameter's name/type/required flag.
fn render_manifest(manifest: &ActionManifest) -> String {
    let mut out = format!("### {}\n{}\n", manifest.name, manifest.description);
    if manifest.params.is_empty() {
        out.push_str("(no parameters)\n");
        return out;
    }
    for param in &manifest.params {
        let ty = render_type(&param.ty);
        let required = if param.required { "required" } else { "optional" };
        out.push_str(&format!("- `{}` ({ty}, {required}): {}\n", param.name, param.description));
    }
    out
}

fn render_type(ty: &ParamType) -> String {
    match ty {
        ParamType::String => "string".to_string(),
        ParamType::Integer => "integer".to_string(),
        ParamType::Boolean => "boolean".to_string(),
        ParamType::Enum { values } => format!("one of {values:?}"),
        ParamType::Array { item } => format!("array of {}", render_type(item)),
    }
}

/// Assembles the full system prompt: the fixed preamble plus one rendered
/// entry per action, in catalog order as handed in (callers pass
/// `registry.manifests()` for name-sorted order, or the raw catalog for the
/// teacher's original listing order).
pub fn build_system_prompt(manifests: &[&ActionManifest]) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str("\n\n## Available Actions\n\n");
    for manifest in manifests {
        prompt.push_str(&render_manifest(manifest));
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_actions::catalog;

    #[test]
    fn prompt_mentions_every_catalog_action() {
        let all = catalog::all();
        let refs: Vec<&ActionManifest> = all.iter().collect();
        let prompt = build_system_prompt(&refs);
        for manifest in &all {
            assert!(prompt.contains(&manifest.name), "missing {}", manifest.name);
        }
    }

    #[test]
    fn prompt_documents_the_index_parameter_for_click() {
        let all = catalog::all();
        let click = all.iter().find(|m| m.name == "click").unwrap();
        let prompt = build_system_prompt(&[click]);
        assert!(prompt.contains("`index`"));
        assert!(!prompt.contains("element_index"));
    }
}
