//! Backend-node-id element interaction primitives: navigate, click, fill,
//! select, scroll, wait.
//!
//! - Built-in waiting with `DomReady` and `Idle` tiers
//! - Comprehensive error handling and reporting
//! - Driven by any `wayfarer_cdp::Cdp` implementor

pub mod errors;
pub mod geometry;
pub mod keyboard;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
