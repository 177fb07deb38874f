//! Maps whatever a subcommand fails with onto the exit-code convention:
//! `0` success, `1` task failure, `2` launch/transport failure, `3` cancelled.

use wayfarer_core::{ErrorKind, WayfarerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    TaskFailed = 1,
    LaunchFailure = 2,
    Cancelled = 3,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Classifies an end-of-run `anyhow::Error` for the process exit code. A
/// wrapped `WayfarerError` carries enough structure to tell a dead transport
/// from a plain task failure; anything else (config, I/O, CLI usage errors)
/// is treated as a launch failure since it never got as far as running a
/// task.
pub fn classify(err: &anyhow::Error) -> ExitCode {
    if let Some(wf) = err.downcast_ref::<WayfarerError>() {
        return match wf.kind {
            ErrorKind::UserCancelled => ExitCode::Cancelled,
            ErrorKind::TransportDead | ErrorKind::PageCrash | ErrorKind::Browser => ExitCode::LaunchFailure,
            _ => ExitCode::TaskFailed,
        };
    }
    ExitCode::LaunchFailure
}
