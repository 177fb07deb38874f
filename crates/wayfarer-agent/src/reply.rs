//! Parses a model reply into `{thinking, action(s)}`. Accepts raw JSON, a
//! fenced ```json block, or — failing both — salvages the first balanced
//! `{...}` object found anywhere in the text.

use std::collections::BTreeMap;

use serde::Deserialize;
use wayfarer_core::action::ParamValue;

use crate::errors::AgentLoopError;

#[derive(Debug, Clone)]
pub struct ParsedAction {
    pub action_type: String,
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub thinking: String,
    pub actions: Vec<ParsedAction>,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(alias = "type", alias = "name")]
    action: String,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
}

impl From<RawAction> for ParsedAction {
    fn from(raw: RawAction) -> Self {
        Self { action_type: raw.action, params: raw.params }
    }
}

#[derive(Deserialize)]
struct RawReply {
    #[serde(default)]
    thinking: String,
    action: Option<RawAction>,
    actions: Option<Vec<RawAction>>,
}

pub fn parse_model_reply(text: &str) -> Result<ParsedReply, AgentLoopError> {
    let candidate = strip_fence(text).unwrap_or(text);

    let raw: RawReply = serde_json::from_str(candidate)
        .or_else(|first_err| {
            salvage_json_object(text)
                .ok_or_else(|| first_err.to_string())
                .and_then(|salvaged| serde_json::from_str(salvaged).map_err(|e| e.to_string()))
        })
        .map_err(AgentLoopError::ReplyParse)?;

    let mut actions: Vec<ParsedAction> = raw.action.into_iter().map(Into::into).collect();
    actions.extend(raw.actions.into_iter().flatten().map(Into::into));

    if actions.is_empty() {
        return Err(AgentLoopError::NoActions);
    }

    Ok(ParsedReply { thinking: raw.thinking, actions })
}

/// Strips a ```json ... ``` or ``` ... ``` fence, returning the inner text.
pub(crate) fn strip_fence(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```"))?;
    let body = body.strip_suffix("```")?;
    Some(body.trim())
}

/// Finds the first balanced `{...}` object in `text`, respecting quoted
/// strings so braces inside string values don't unbalance the scan.
pub(crate) fn salvage_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_json_with_a_single_action() {
        let reply = parse_model_reply(r#"{"thinking":"click it","action":{"type":"click","params":{"index":3}}}"#).unwrap();
        assert_eq!(reply.thinking, "click it");
        assert_eq!(reply.actions.len(), 1);
        assert_eq!(reply.actions[0].action_type, "click");
    }

    #[test]
    fn parses_an_actions_array() {
        let reply = parse_model_reply(
            r#"{"thinking":"two steps","actions":[{"type":"scroll","params":{"direction":"down"}},{"type":"wait","params":{}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.actions.len(), 2);
    }

    #[test]
    fn strips_a_fenced_json_block() {
        let text = "```json\n{\"thinking\":\"t\",\"action\":{\"type\":\"wait\",\"params\":{}}}\n```";
        let reply = parse_model_reply(text).unwrap();
        assert_eq!(reply.actions[0].action_type, "wait");
    }

    #[test]
    fn salvages_json_embedded_in_prose() {
        let text = "Sure, here you go: {\"thinking\":\"ok\",\"action\":{\"type\":\"done\",\"params\":{\"text\":\"done\",\"success\":true}}} Hope that helps!";
        let reply = parse_model_reply(text).unwrap();
        assert_eq!(reply.actions[0].action_type, "done");
    }

    #[test]
    fn rejects_a_reply_with_neither_action_nor_actions() {
        let err = parse_model_reply(r#"{"thinking":"nothing to do"}"#).unwrap_err();
        assert!(matches!(err, AgentLoopError::NoActions));
    }

    #[test]
    fn rejects_unparseable_text() {
        let err = parse_model_reply("not json at all").unwrap_err();
        assert!(matches!(err, AgentLoopError::ReplyParse(_)));
    }
}
