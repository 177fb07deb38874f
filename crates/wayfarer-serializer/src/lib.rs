//! Turns an `EnhancedNode` forest into an indexed, LLM-readable listing of
//! interactive elements plus the selector map tools address by index
//! (spec §4.D).

pub mod model;
pub mod serializer;

pub use model::{SelectorMap, SerializeOptions, SerializeOutput, SerializeTimings, SimplifiedNode};
pub use serializer::Serializer;
