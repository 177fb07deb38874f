use std::time::Instant;

use wayfarer_core::{FrameId, SessionId, TargetId};

use crate::health::TargetHealth;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifeState {
    Init,
    Ready,
    Active,
    Closing,
    Closed,
    Lost,
}

#[derive(Clone, Debug)]
pub struct SessionCtx {
    pub id: SessionId,
    pub profile_name: String,
    pub created_at: Instant,
    pub focused_target: Option<TargetId>,
    pub state: LifeState,
}

impl SessionCtx {
    pub fn new(profile_name: impl Into<String>) -> (SessionId, Self) {
        let id = SessionId::new();
        let ctx = Self {
            id: id.clone(),
            profile_name: profile_name.into(),
            created_at: Instant::now(),
            focused_target: None,
            state: LifeState::Ready,
        };
        (id, ctx)
    }
}

/// One CDP-attachable page, tracked alongside the lower-level `PageId` the
/// transport adapter keyed it under when it was created.
#[derive(Clone, Debug)]
pub struct TargetCtx {
    pub id: TargetId,
    pub session: SessionId,
    pub cdp_page: wayfarer_cdp::PageId,
    pub state: LifeState,
    pub main_frame: Option<FrameId>,
    pub focused_frame: Option<FrameId>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub last_active_at: Instant,
    pub health: TargetHealth,
}

impl TargetCtx {
    pub fn new(session: SessionId, cdp_page: wayfarer_cdp::PageId) -> (TargetId, Self) {
        let id = TargetId::new();
        let ctx = Self {
            id: id.clone(),
            session,
            cdp_page,
            state: LifeState::Init,
            main_frame: None,
            focused_frame: None,
            url: None,
            title: None,
            last_active_at: Instant::now(),
            health: TargetHealth::default(),
        };
        (id, ctx)
    }
}

#[derive(Clone, Debug)]
pub struct FrameCtx {
    pub id: FrameId,
    pub target: TargetId,
    pub parent: Option<FrameId>,
    pub children: Vec<FrameId>,
    pub state: LifeState,
    pub is_main: bool,
}

impl FrameCtx {
    pub fn new(target: TargetId, parent: Option<FrameId>, is_main: bool) -> (FrameId, Self) {
        let id = FrameId::new();
        let ctx = Self {
            id: id.clone(),
            target,
            parent,
            children: Vec::new(),
            state: LifeState::Init,
            is_main,
        };
        (id, ctx)
    }
}
