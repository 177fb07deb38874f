//! The address a command is routed to: a specific frame within a specific page
//! within a specific session, plus the mutex key the scheduler serialises on.

use std::fmt;

use crate::ids::{FrameId, SessionId, TargetId};

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecRoute {
    pub session: SessionId,
    pub target: TargetId,
    pub frame: FrameId,
    pub mutex_key: String,
}

impl ExecRoute {
    pub fn new(session: SessionId, target: TargetId, frame: FrameId) -> Self {
        let mutex_key = format!("frame:{}", frame.0);
        Self {
            session,
            target,
            frame,
            mutex_key,
        }
    }
}

impl fmt::Display for ExecRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session={} target={} frame={} mutex={}",
            self.session.0, self.target.0, self.frame.0, self.mutex_key
        )
    }
}
