//! The `Action` / `ActionResult` envelope that crosses the action-registry
//! boundary (spec §3, §4.F).

use std::collections::BTreeMap;

use crate::ids::ActionId;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-full", serde(untagged))]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ParamValue>),
    Object(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Number(n) if *n >= 0.0 => Some(*n as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A single dispatched action: a type name plus its already-validated
/// parameters. Immutable once constructed — the registry rejects anything
/// that wouldn't validate against the action's JSON schema before an `Action`
/// is ever built.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub action_type: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, params: BTreeMap<String, ParamValue>) -> Self {
        Self {
            id: ActionId::new(),
            action_type: action_type.into(),
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

/// The outcome of running an `Action` (spec §3): optional content the caller
/// asked to extract, the two memory strings that feed the composer on the
/// next turn, whether the agent should stop, and an optional structured
/// error when the action failed but the loop can continue.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionResult {
    pub extracted_content: Option<String>,
    pub long_term_memory: Option<String>,
    pub short_term_memory: Option<String>,
    pub include_in_memory: bool,
    pub is_done: bool,
    pub success: Option<bool>,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(long_term_memory: impl Into<String>) -> Self {
        Self {
            long_term_memory: Some(long_term_memory.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }

    pub fn done(success: bool, extracted_content: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(extracted_content.into()),
            is_done: true,
            success: Some(success),
            include_in_memory: true,
            ..Default::default()
        }
    }

    pub fn failed(long_term_memory: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            long_term_memory: Some(long_term_memory.into()),
            error: Some(error.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_param_lookup_misses_cleanly() {
        let action = Action::new("click", BTreeMap::new());
        assert!(action.param("index").is_none());
    }

    #[test]
    fn done_result_carries_success_flag() {
        let result = ActionResult::done(true, "finished");
        assert!(result.is_done);
        assert_eq!(result.success, Some(true));
    }
}
