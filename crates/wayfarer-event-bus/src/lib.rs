//! Event bus, bounded history, and passive watchdogs for the agent runtime
//! (spec §4.G). Every component that needs to observe another component's
//! activity subscribes here rather than holding a direct reference to it.

mod bus;
mod errors;
mod watchdog;

pub use bus::{EventBus, Subscription};
pub use errors::EventBusError;
pub use watchdog::{
    CrashRecoveryWatchdog, DomThrottleWatchdog, DownloadWatchdog, PermissionPromptWatchdog, Watchdog,
    WatchdogFinding, WatchdogRegistry,
};
