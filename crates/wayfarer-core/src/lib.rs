#![allow(dead_code)]
//! Shared primitives for the Wayfarer agent runtime.
//!
//! Every other crate in the workspace depends on this one for identifiers, the
//! execution route a command is addressed to, the error taxonomy, and the
//! `Action`/`ActionResult`/`Event` envelopes that cross component boundaries.

pub mod action;
pub mod error;
pub mod event;
pub mod ids;
pub mod route;

pub use action::{Action, ActionResult};
pub use error::{ErrorKind, WayfarerError};
pub use event::Event;
pub use ids::{ActionId, BackendNodeId, FrameId, SelectorIndex, SessionId, TargetId, TaskId};
pub use route::ExecRoute;
