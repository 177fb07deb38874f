//! The macro data model: a persisted, ordered sequence of step records
//! consumed by the recorder/replayer collaborator. The runtime only ever
//! touches this through the action interface — replay dispatches each step's
//! resolved action through `wayfarer-actions`, it does not execute flow
//! control itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wayfarer_core::action::ParamValue;

/// A step's value is late-bound: a literal recorded at capture time, a
/// question the replayer must ask the user, or a prompt the replayer hands to
/// a model — resolved immediately before the step's action runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ValueSource {
    Static { value: String },
    Prompt { question: String },
    Ai { prompt: String },
}

impl ValueSource {
    pub fn static_value(value: impl Into<String>) -> Self {
        ValueSource::Static { value: value.into() }
    }
}

/// One recorded step. `Navigation`/`Click`/`Input`/`Keypress`/`Wait`/`Scroll`/
/// `Submit` carry an element descriptor plus whatever value source the field
/// needs; `Conditional`/`LoopStart`/`LoopEnd` are flow-control markers in the
/// flat step list rather than a nested tree, matching how the recorder
/// captures a linear session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Navigation { url: String },
    Click { element: ElementDescriptor },
    Input { element: ElementDescriptor, value: ValueSource, submit: bool },
    Keypress { key: String },
    Wait { ms: u64 },
    Scroll { direction: String, pages: u32 },
    Submit { element: ElementDescriptor },
    /// A branch point recorded for replay-time review; the condition itself
    /// is evaluated by the replayer, not by this crate.
    Conditional { description: String },
    LoopStart { label: String },
    LoopEnd { label: String },
}

/// Tag, id, class, name, type, placeholder, label text, and a short inner-text
/// excerpt — the descriptor fields spec's record stream carries per element,
/// enough to re-locate the element at replay time without a backend-node-id
/// (which does not survive across page loads).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub name: Option<String>,
    pub element_type: Option<String>,
    pub placeholder: Option<String>,
    pub label: Option<String>,
    pub inner_text: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MacroStep {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub step: StepKind,
}

impl MacroStep {
    pub fn new(id: impl Into<String>, step: StepKind) -> Self {
        Self { id: id.into(), recorded_at: Utc::now(), step }
    }
}

/// A persisted macro: one JSON file per macro, keyed by `id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Macro {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<MacroStep>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Macro {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            steps: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn push_step(&mut self, step: MacroStep) {
        self.steps.push(step);
        self.updated_at = Utc::now();
    }
}

/// A bound step ready for replay: the action type and already-resolved
/// parameters the registry's `dispatch` expects.
#[derive(Clone, Debug)]
pub struct ResolvedStep {
    pub action_type: String,
    pub params: BTreeMap<String, ParamValue>,
}

/// One row of the macro index file: enough to list macros without opening
/// every per-macro JSON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MacroIndexEntry {
    pub id: String,
    pub name: String,
    pub step_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Macro> for MacroIndexEntry {
    fn from(m: &Macro) -> Self {
        Self { id: m.id.clone(), name: m.name.clone(), step_count: m.steps.len(), updated_at: m.updated_at }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MacroIndex {
    pub entries: Vec<MacroIndexEntry>,
}

impl MacroIndex {
    pub fn upsert(&mut self, entry: MacroIndexEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);
    }
}
