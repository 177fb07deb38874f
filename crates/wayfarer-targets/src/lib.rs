//! Session/Target/Frame lifecycle tracking for the Wayfarer agent runtime
//! (spec §4.B): keeps a map from target to its session and CDP-level page,
//! resolves execution routes for the rest of the runtime to address
//! commands with, and bridges the CDP adapter's raw events into the
//! named `tab_created`/`tab_closed`/`switch_tab`/`navigation_*` events
//! the agent loop and watchdogs observe.

pub mod errors;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod state;

pub use ingest::IngestHandle;
pub use model::{FrameCtx, LifeState, SessionCtx, TargetCtx};
pub use state::{LaunchProfile, RoutePrefer, RoutingHint, TargetManagerImpl};
