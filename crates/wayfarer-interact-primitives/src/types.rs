//! Core data types for element interaction primitives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use wayfarer_cdp::PageId;
use wayfarer_core::BackendNodeId;

use crate::errors::InteractError;

/// Execution context for a single primitive call.
///
/// Unlike the teacher's route-addressed context, every primitive here is
/// addressed directly at a `PageId` plus a `BackendNodeId` resolved from the
/// current selector map — there is no separate policy or frame-routing layer
/// at this depth.
#[derive(Clone)]
pub struct ExecCtx {
    /// Page the action executes against.
    pub page: PageId,

    /// Deadline for this operation.
    pub deadline: Instant,

    /// Cancellation token for cooperative cancellation.
    pub cancel_token: CancellationToken,

    /// Unique identifier for this action, for tracing and correlation.
    pub action_id: String,
}

impl ExecCtx {
    pub fn new(page: PageId, deadline: Instant, cancel_token: CancellationToken) -> Self {
        Self {
            page,
            deadline,
            cancel_token,
            action_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn is_timeout(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining_time(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Built-in waiting tiers for actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitTier {
    /// No built-in waiting.
    None,
    /// Wait for DOM ready.
    DomReady,
    /// Wait for DOM ready plus network quiet.
    Idle,
}

impl Default for WaitTier {
    fn default() -> Self {
        WaitTier::DomReady
    }
}

/// Pre-check result before executing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecheckResult {
    pub passed: bool,
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Post-action signals captured after execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSignals {
    pub dom_mutations: u32,
    pub network_requests: u32,
    pub console_messages: Vec<String>,
    pub url_after: Option<String>,
    pub title_after: Option<String>,
}

impl Default for PostSignals {
    fn default() -> Self {
        Self {
            dom_mutations: 0,
            network_requests: 0,
            console_messages: Vec::new(),
            url_after: None,
            title_after: None,
        }
    }
}

/// Execution report for one primitive call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub ok: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub precheck: Option<PrecheckResult>,
    pub post_signals: PostSignals,
    pub error: Option<String>,
}

impl ActionReport {
    pub fn success(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            ok: true,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            precheck: None,
            post_signals: PostSignals::default(),
            error: None,
        }
    }

    pub fn failure(started_at: DateTime<Utc>, latency_ms: u64, error: InteractError) -> Self {
        Self {
            ok: false,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            precheck: None,
            post_signals: PostSignals::default(),
            error: Some(error.to_string()),
        }
    }

    pub fn with_precheck(mut self, precheck: PrecheckResult) -> Self {
        self.precheck = Some(precheck);
        self
    }

    pub fn with_signals(mut self, signals: PostSignals) -> Self {
        self.post_signals = signals;
        self
    }
}

/// Scroll target specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScrollTarget {
    Top,
    Bottom,
    Element(BackendNodeId),
    /// Positive scrolls down, negative scrolls up.
    Pixels(i32),
}

/// Scroll behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

impl Default for ScrollBehavior {
    fn default() -> Self {
        ScrollBehavior::Smooth
    }
}

/// Select method for dropdown/listbox selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectMethod {
    Text,
    Value,
    Index,
}

impl Default for SelectMethod {
    fn default() -> Self {
        SelectMethod::Value
    }
}

/// Wait condition for explicit waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WaitCondition {
    ElementVisible(BackendNodeId),
    ElementHidden(BackendNodeId),
    UrlMatches(String),
    UrlEquals(String),
    TitleMatches(String),
    /// Fixed duration, in milliseconds.
    Duration(u64),
    /// No network requests for N milliseconds.
    NetworkIdle(u64),
}
