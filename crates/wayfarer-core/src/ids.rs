//! Identifier newtypes shared across the workspace.
//!
//! All identifiers wrap a UUID-derived string rather than the UUID type directly
//! so crates that don't enable `serde-full` still get `Clone + Eq + Hash` without
//! pulling in `uuid`'s serde feature.

use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
        #[derive(Clone, Debug, Eq, PartialEq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(SessionId, "A browser session: one launched Chromium process plus its profile.");
uuid_id!(TargetId, "A CDP attachable page/frame — spec §3 `Target`.");
uuid_id!(FrameId, "A frame within a target.");
uuid_id!(ActionId, "One dispatched action invocation.");
uuid_id!(TaskId, "One top-level agent task (`run(task, options)`).");

/// A node's backend-node-id, stable for the node's lifetime within one page.
/// Spec glossary: "stable for the node's lifetime within one page".
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BackendNodeId(pub i64);

impl std::fmt::Display for BackendNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The small integer shown to the model in the serialised listing; 1-based per
/// spec §9 open question ("the reference listing uses 1-based indices").
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SelectorIndex(pub u32);

impl std::fmt::Display for SelectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(TargetId::new(), TargetId::new());
    }

    #[test]
    fn selector_index_displays_as_plain_integer() {
        assert_eq!(SelectorIndex(7).to_string(), "7");
    }
}
