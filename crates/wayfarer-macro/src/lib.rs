//! Macro data model and persistence.
//!
//! A macro is a recorded, ordered sequence of step records — the same
//! external collaborator surface spec describes for the recorder/replayer:
//! the runtime touches this crate only through [`types::Macro`] and
//! [`store::MacroStore`], dispatching each resolved step through the action
//! registry rather than through any execution engine owned here.

pub mod errors;
pub mod store;
pub mod types;
pub mod validate;

pub use errors::MacroError;
pub use store::MacroStore;
pub use types::{ElementDescriptor, Macro, MacroIndex, MacroIndexEntry, MacroStep, ResolvedStep, StepKind, ValueSource};
pub use validate::validate_macro_name;
