use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::json;

use wayfarer_cdp::{Cdp, CdpAdapter};
use wayfarer_core::{Event, ExecRoute, FrameId, SessionId, TargetId, WayfarerError};
use wayfarer_event_bus::EventBus;

use crate::{
    errors::RegistryError,
    metrics,
    model::{FrameCtx, LifeState, SessionCtx, TargetCtx},
};

fn now() -> Instant {
    Instant::now()
}

/// Which frame within a target a route hint should resolve to when more than
/// one is attached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoutePrefer {
    MainFrame,
    Focused,
    RecentNav,
}

/// A caller's hint about which session/target/frame a command should be
/// routed to. Every field left `None` falls back to whatever is currently
/// focused.
#[derive(Clone, Debug, Default)]
pub struct RoutingHint {
    pub session: Option<SessionId>,
    pub target: Option<TargetId>,
    pub frame: Option<FrameId>,
    pub prefer: Option<RoutePrefer>,
}

/// Anti-automation shimming and viewport defaults applied to every newly
/// launched target.
#[derive(Clone, Debug)]
pub struct LaunchProfile {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub accept_language: Option<String>,
    pub timezone: Option<String>,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self {
            viewport_width: 1366,
            viewport_height: 768,
            accept_language: Some("en-US,en;q=0.9".to_string()),
            timezone: None,
        }
    }
}

/// Owns the session/target/frame lifecycle and resolves execution routes,
/// driving the underlying CDP adapter for the operations that need an
/// actual browser round trip (launch, navigate, reload, back/forward).
pub struct TargetManagerImpl {
    pub sessions: DashMap<SessionId, Arc<RwLock<SessionCtx>>>,
    pub targets: DashMap<TargetId, Arc<RwLock<TargetCtx>>>,
    pub frames: DashMap<FrameId, Arc<RwLock<FrameCtx>>>,
    cdp: Arc<CdpAdapter>,
    bus: EventBus,
    launch_profile: LaunchProfile,
}

impl TargetManagerImpl {
    pub fn new(cdp: Arc<CdpAdapter>, bus: EventBus) -> Self {
        Self::with_launch_profile(cdp, bus, LaunchProfile::default())
    }

    pub fn with_launch_profile(cdp: Arc<CdpAdapter>, bus: EventBus, launch_profile: LaunchProfile) -> Self {
        Self {
            sessions: DashMap::new(),
            targets: DashMap::new(),
            frames: DashMap::new(),
            cdp,
            bus,
            launch_profile,
        }
    }

    fn emit(&self, event_type: &str, payload: serde_json::Value, session: Option<SessionId>) {
        let bus = self.bus.clone();
        let mut event = Event::new(event_type, payload);
        if let Some(session) = session {
            event = event.for_session(session);
        }
        tokio::spawn(async move {
            bus.emit(event).await;
        });
    }

    pub fn health_probe_tick(&self) {
        metrics::record_health_probe();
    }

    pub(crate) fn ensure_session(&self, session: &SessionId) -> Result<Arc<RwLock<SessionCtx>>, WayfarerError> {
        self.sessions
            .get(session)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound.into_wayfarer_error(format!("session {}", session.0)))
    }

    pub(crate) fn ensure_target(&self, target: &TargetId) -> Result<Arc<RwLock<TargetCtx>>, WayfarerError> {
        self.targets
            .get(target)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound.into_wayfarer_error(format!("target {}", target.0)))
    }

    pub(crate) fn ensure_frame(&self, frame: &FrameId) -> Result<Arc<RwLock<FrameCtx>>, WayfarerError> {
        self.frames
            .get(frame)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound.into_wayfarer_error(format!("frame {}", frame.0)))
    }

    fn route_for_frame(&self, frame_id: &FrameId) -> Result<ExecRoute, WayfarerError> {
        let frame = self.ensure_frame(frame_id)?;
        let frame = frame.read().clone();
        let target = self.ensure_target(&frame.target)?;
        let target = target.read().clone();
        self.build_exec_route(target.session, target.id, frame.id)
    }

    fn route_for_target(&self, target_id: &TargetId, prefer: Option<RoutePrefer>) -> Result<ExecRoute, WayfarerError> {
        let target = self.ensure_target(target_id)?;
        let target = target.read().clone();
        let frame = self
            .choose_frame(&target, prefer)
            .ok_or_else(|| RegistryError::NotFound.into_wayfarer_error(format!("frame for target {}", target_id.0)))?;
        self.build_exec_route(target.session, target.id, frame)
    }

    fn route_for_session(&self, session_id: &SessionId, prefer: Option<RoutePrefer>) -> Result<ExecRoute, WayfarerError> {
        let session = self.ensure_session(session_id)?;
        let session = session.read().clone();
        if let Some(target_id) = session.focused_target.clone() {
            return self.route_for_target(&target_id, prefer);
        }
        let candidate = self
            .targets
            .iter()
            .find(|entry| entry.value().read().session == session.id)
            .map(|entry| entry.key().clone());
        if let Some(tid) = candidate {
            return self.route_for_target(&tid, prefer);
        }
        Err(RegistryError::NotFound.into_wayfarer_error(format!("no targets for session {}", session_id.0)))
    }

    fn route_default(&self) -> Result<ExecRoute, WayfarerError> {
        if let Some(entry) = self.sessions.iter().next() {
            let session = entry.value().read().clone();
            return self.route_for_session(&session.id, None);
        }
        Err(RegistryError::NotFound.into_wayfarer_error("no sessions available"))
    }

    fn pick_recent_target(&self, session: &SessionId, exclude: Option<&TargetId>) -> Option<TargetId> {
        let mut selected: Option<(TargetId, Instant)> = None;
        for entry in self.targets.iter() {
            let target_id = entry.key().clone();
            if exclude.map(|ex| ex == &target_id).unwrap_or(false) {
                continue;
            }
            let ctx = entry.value().read();
            if ctx.session != *session {
                continue;
            }
            match &mut selected {
                Some((_, ts)) if ctx.last_active_at <= *ts => {}
                _ => selected = Some((target_id, ctx.last_active_at)),
            }
        }
        selected.map(|(id, _)| id)
    }

    fn build_exec_route(&self, session: SessionId, target: TargetId, frame: FrameId) -> Result<ExecRoute, WayfarerError> {
        if !self.sessions.contains_key(&session) || !self.targets.contains_key(&target) || !self.frames.contains_key(&frame) {
            return Err(RegistryError::NotFound.into_wayfarer_error("route components missing"));
        }
        Ok(ExecRoute::new(session, target, frame))
    }

    fn choose_frame(&self, target: &TargetCtx, prefer: Option<RoutePrefer>) -> Option<FrameId> {
        match prefer {
            Some(RoutePrefer::MainFrame) => target.main_frame.clone().or_else(|| target.focused_frame.clone()),
            Some(RoutePrefer::Focused) => target.focused_frame.clone().or_else(|| target.main_frame.clone()),
            Some(RoutePrefer::RecentNav) => target.focused_frame.clone().or_else(|| target.main_frame.clone()),
            None => target.focused_frame.clone().or_else(|| target.main_frame.clone()),
        }
    }

    pub fn frame_attached(&self, target: &TargetId, parent: Option<FrameId>, is_main: bool) -> Result<FrameId, WayfarerError> {
        let target_arc = self.ensure_target(target)?;
        let mut target_ctx = target_arc.write();
        let parent_id = if let Some(ref pid) = parent {
            let parent_arc = self.ensure_frame(pid)?;
            let parent_ctx = parent_arc.read().clone();
            if parent_ctx.target != *target {
                return Err(RegistryError::OwnershipConflict.into_wayfarer_error("parent frame not in target"));
            }
            Some(parent_ctx.id.clone())
        } else {
            None
        };

        let (frame_id, mut frame_ctx) = FrameCtx::new(target.clone(), parent_id.clone(), is_main);
        frame_ctx.state = LifeState::Ready;

        if let Some(parent_id) = parent_id {
            if let Some(parent_arc) = self.frames.get(&parent_id) {
                parent_arc.value().write().children.push(frame_id.clone());
            }
        }

        if is_main {
            target_ctx.main_frame = Some(frame_id.clone());
        }

        self.frames.insert(frame_id.clone(), Arc::new(RwLock::new(frame_ctx)));
        metrics::set_frame_count(self.frames.len());

        if target_ctx.focused_frame.is_none() {
            target_ctx.focused_frame = target_ctx.main_frame.clone().or(Some(frame_id.clone()));
        }

        target_ctx.last_active_at = now();
        let session_for_event = target_ctx.session.clone();
        let target_for_event = target.clone();
        let frame_for_event = frame_id.clone();
        drop(target_ctx);

        self.emit(
            "frame.attached",
            json!({ "target": target_for_event.0, "frame": frame_for_event.0 }),
            Some(session_for_event),
        );

        Ok(frame_for_event)
    }

    pub fn frame_detached(&self, frame: &FrameId) -> Result<(), WayfarerError> {
        let frame_arc = self.ensure_frame(frame)?;
        let frame_ctx = frame_arc.read().clone();
        let target_id = frame_ctx.target.clone();

        self.remove_frame_recursive(frame);
        metrics::set_frame_count(self.frames.len());

        let target_arc = self.ensure_target(&target_id)?;
        let mut target_ctx = target_arc.write();
        let session_id = target_ctx.session.clone();
        if target_ctx.main_frame.as_ref() == Some(frame) {
            target_ctx.main_frame = None;
        }
        if target_ctx.focused_frame.as_ref() == Some(frame) {
            target_ctx.focused_frame = target_ctx.main_frame.clone().or_else(|| {
                let mut fallback = None;
                for entry in self.frames.iter() {
                    let ctx = entry.value().read();
                    if ctx.target == target_id {
                        fallback = Some(ctx.id.clone());
                        break;
                    }
                }
                fallback
            });
        }
        target_ctx.last_active_at = now();
        drop(target_ctx);

        self.emit(
            "frame.detached",
            json!({ "target": target_id.0, "frame": frame.0 }),
            Some(session_id),
        );
        Ok(())
    }

    fn remove_frame_recursive(&self, frame: &FrameId) {
        if let Some(frame_arc) = self.frames.remove(frame).map(|(_, arc)| arc) {
            let frame_ctx = frame_arc.read().clone();
            if let Some(parent_id) = frame_ctx.parent.clone() {
                if let Some(parent_arc) = self.frames.get(&parent_id) {
                    parent_arc.value().write().children.retain(|child| child != frame);
                }
            }
            for child in frame_ctx.children {
                self.remove_frame_recursive(&child);
            }
        }
    }

    pub async fn session_create(&self, profile: &str) -> Result<SessionId, WayfarerError> {
        let (id, ctx) = SessionCtx::new(profile);
        self.sessions.insert(id.clone(), Arc::new(RwLock::new(ctx)));
        metrics::set_session_count(self.sessions.len());
        Ok(id)
    }

    pub fn session_list(&self) -> Vec<SessionCtx> {
        self.sessions.iter().map(|entry| entry.value().read().clone()).collect()
    }

    pub fn current_target(&self, session: &SessionId) -> Option<TargetId> {
        self.sessions.get(session).and_then(|entry| entry.value().read().focused_target.clone())
    }

    /// Looks up one target's context regardless of which session owns it.
    pub fn get_target(&self, target: &TargetId) -> Result<TargetCtx, WayfarerError> {
        Ok(self.ensure_target(target)?.read().clone())
    }

    pub fn list_targets(&self, session: &SessionId) -> Vec<TargetCtx> {
        self.targets
            .iter()
            .filter(|entry| entry.value().read().session == *session)
            .map(|entry| entry.value().read().clone())
            .collect()
    }

    /// Opens a target under `session`, applying the stable viewport and
    /// anti-automation shimming every launch gets.
    async fn open_target(&self, session: SessionId, url: &str) -> Result<TargetId, WayfarerError> {
        let cdp_page = self.cdp.create_page(url).await.map_err(WayfarerError::from)?;

        self.cdp
            .set_device_metrics(
                cdp_page,
                self.launch_profile.viewport_width,
                self.launch_profile.viewport_height,
                1.0,
                false,
            )
            .await
            .map_err(WayfarerError::from)?;
        if let Some(timezone) = &self.launch_profile.timezone {
            self.cdp.set_timezone(cdp_page, timezone).await.map_err(WayfarerError::from)?;
        }

        let (target_id, mut target_ctx) = TargetCtx::new(session.clone(), cdp_page);
        let (frame_id, mut frame_ctx) = FrameCtx::new(target_id.clone(), None, true);
        target_ctx.main_frame = Some(frame_id.clone());
        target_ctx.focused_frame = Some(frame_id.clone());
        target_ctx.state = LifeState::Ready;
        target_ctx.url = Some(url.to_string());
        frame_ctx.state = LifeState::Ready;

        self.frames.insert(frame_id.clone(), Arc::new(RwLock::new(frame_ctx)));
        self.targets.insert(target_id.clone(), Arc::new(RwLock::new(target_ctx)));
        metrics::set_target_count(self.targets.len());
        metrics::set_frame_count(self.frames.len());

        if let Some(session_entry) = self.sessions.get(&session) {
            let mut session_ctx = session_entry.value().write();
            if session_ctx.focused_target.is_none() {
                session_ctx.focused_target = Some(target_id.clone());
            }
        }

        self.emit(
            "tab_created",
            json!({ "target": target_id.0, "url": url }),
            Some(session),
        );
        Ok(target_id)
    }

    /// Launches a fresh session with one initial target, per spec §4.B.
    pub async fn launch(&self, profile: &str) -> Result<(SessionId, TargetId), WayfarerError> {
        let session = self.session_create(profile).await?;
        let target = self.open_target(session.clone(), "about:blank").await?;
        Ok((session, target))
    }

    /// Tears a session and every target it owns down.
    pub async fn close(&self, session: SessionId) -> Result<(), WayfarerError> {
        let target_ids: Vec<TargetId> = self
            .targets
            .iter()
            .filter(|entry| entry.value().read().session == session)
            .map(|entry| entry.key().clone())
            .collect();
        for target in target_ids {
            self.close_target(target).await?;
        }
        self.sessions.remove(&session);
        metrics::set_session_count(self.sessions.len());
        Ok(())
    }

    pub async fn switch_to(&self, target: TargetId) -> Result<(), WayfarerError> {
        let session_id = {
            let target_arc = self.ensure_target(&target)?;
            let mut target_ctx = target_arc.write();
            target_ctx.state = LifeState::Active;
            target_ctx.last_active_at = now();
            if target_ctx.focused_frame.is_none() {
                target_ctx.focused_frame = target_ctx.main_frame.clone();
            }
            target_ctx.session.clone()
        };

        {
            let session_arc = self.ensure_session(&session_id)?;
            let mut session_ctx = session_arc.write();
            session_ctx.focused_target = Some(target.clone());
            session_ctx.state = LifeState::Active;
        }
        self.emit("switch_tab", json!({ "target": target.0 }), Some(session_id));
        Ok(())
    }

    pub async fn close_target(&self, target: TargetId) -> Result<(), WayfarerError> {
        let session_id = {
            let target_arc = self.ensure_target(&target)?;
            let mut target_ctx = target_arc.write();
            target_ctx.state = LifeState::Closing;
            target_ctx.session.clone()
        };

        let frames: Vec<FrameId> = self
            .frames
            .iter()
            .filter(|entry| entry.value().read().target == target)
            .map(|entry| entry.key().clone())
            .collect();
        for frame in frames {
            self.frames.remove(&frame);
        }
        self.targets.remove(&target);

        if let Some(session_entry) = self.sessions.get(&session_id) {
            let mut session_ctx = session_entry.value().write();
            if session_ctx.focused_target.as_ref() == Some(&target) {
                session_ctx.focused_target = self.pick_recent_target(&session_id, Some(&target));
            }
            if session_ctx.focused_target.is_none() {
                session_ctx.state = LifeState::Ready;
            }
        }

        self.emit("tab_closed", json!({ "target": target.0 }), Some(session_id));
        metrics::set_target_count(self.targets.len());
        metrics::set_frame_count(self.frames.len());
        Ok(())
    }

    pub async fn navigate(
        &self,
        target: TargetId,
        url: &str,
        new_tab: bool,
        deadline: Duration,
    ) -> Result<TargetId, WayfarerError> {
        if new_tab {
            let session = self.ensure_target(&target)?.read().session.clone();
            let new_target = self.open_target(session, url).await?;
            self.switch_to(new_target.clone()).await?;
            return Ok(new_target);
        }

        let (session_id, cdp_page) = {
            let target_arc = self.ensure_target(&target)?;
            let ctx = target_arc.read();
            (ctx.session.clone(), ctx.cdp_page)
        };

        self.emit(
            "navigation_started",
            json!({ "target": target.0, "url": url }),
            Some(session_id.clone()),
        );
        self.cdp.navigate(cdp_page, url, deadline).await.map_err(WayfarerError::from)?;

        if let Some(target_arc) = self.targets.get(&target) {
            let mut ctx = target_arc.value().write();
            ctx.url = Some(url.to_string());
            ctx.last_active_at = now();
        }
        self.emit(
            "navigation_complete",
            json!({ "target": target.0, "url": url }),
            Some(session_id),
        );
        Ok(target)
    }

    pub async fn reload(&self, target: TargetId) -> Result<(), WayfarerError> {
        let (url, deadline) = {
            let target_arc = self.ensure_target(&target)?;
            let ctx = target_arc.read();
            (ctx.url.clone().unwrap_or_else(|| "about:blank".to_string()), Duration::from_secs(30))
        };
        self.navigate(target, &url, false, deadline).await?;
        Ok(())
    }

    pub async fn go_back(&self, target: TargetId) -> Result<(), WayfarerError> {
        let cdp_page = self.ensure_target(&target)?.read().cdp_page;
        self.cdp
            .evaluate_script(cdp_page, "history.back(); void 0;")
            .await
            .map_err(WayfarerError::from)?;
        Ok(())
    }

    pub async fn go_forward(&self, target: TargetId) -> Result<(), WayfarerError> {
        let cdp_page = self.ensure_target(&target)?.read().cdp_page;
        self.cdp
            .evaluate_script(cdp_page, "history.forward(); void 0;")
            .await
            .map_err(WayfarerError::from)?;
        Ok(())
    }

    pub async fn frame_focus(&self, target: TargetId, frame: FrameId) -> Result<(), WayfarerError> {
        let frame_arc = self.ensure_frame(&frame)?;
        let frame_ctx = frame_arc.read().clone();
        if frame_ctx.target != target {
            return Err(RegistryError::OwnershipConflict.into_wayfarer_error("frame does not belong to target"));
        }

        let session_id = {
            let target_arc = self.ensure_target(&target)?;
            let mut target_ctx = target_arc.write();
            target_ctx.focused_frame = Some(frame.clone());
            target_ctx.state = LifeState::Active;
            target_ctx.last_active_at = now();
            target_ctx.session.clone()
        };

        {
            let session_arc = self.ensure_session(&session_id)?;
            let mut session_ctx = session_arc.write();
            session_ctx.focused_target = Some(target.clone());
            session_ctx.state = LifeState::Active;
        }

        self.emit(
            "frame.focused",
            json!({ "target": target.0, "frame": frame.0 }),
            Some(session_id),
        );
        Ok(())
    }

    pub async fn route_resolve(&self, hint: Option<RoutingHint>) -> Result<ExecRoute, WayfarerError> {
        if let Some(hint) = hint {
            if let Some(frame_id) = hint.frame {
                return self.route_for_frame(&frame_id);
            }
            if let Some(target_id) = hint.target {
                return self.route_for_target(&target_id, hint.prefer);
            }
            if let Some(session_id) = hint.session {
                return self.route_for_session(&session_id, hint.prefer);
            }
        }
        self.route_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_cdp::{event_bus, CdpConfig};

    async fn new_manager() -> TargetManagerImpl {
        let (cdp_bus, _rx) = event_bus(32);
        let adapter = Arc::new(CdpAdapter::new(CdpConfig::default(), cdp_bus));
        Arc::clone(&adapter).start().await.expect("adapter start");
        TargetManagerImpl::new(adapter, EventBus::new())
    }

    #[tokio::test]
    async fn launch_creates_session_and_initial_target() {
        let manager = new_manager().await;
        let (session, target) = manager.launch("default").await.unwrap();

        let sessions = manager.session_list();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, session);
        assert_eq!(manager.current_target(&session), Some(target));
    }

    #[tokio::test]
    async fn route_defaults_to_focused_target() {
        let manager = new_manager().await;
        let (session, _target_a) = manager.launch("user").await.unwrap();
        let target_b = manager.navigate(manager.current_target(&session).unwrap(), "about:blank", true, Duration::from_secs(5))
            .await
            .unwrap();

        let exec = manager.route_resolve(None).await.unwrap();
        assert_eq!(exec.session, session);
        assert_eq!(exec.target, target_b);
    }

    #[tokio::test]
    async fn frame_focus_updates_route() {
        let manager = new_manager().await;
        let (_session, target) = manager.launch("user").await.unwrap();

        let frame_id = {
            let target_ctx = manager.ensure_target(&target).unwrap();
            let read = target_ctx.read().clone();
            let (frame_id, mut frame_ctx) = FrameCtx::new(read.id.clone(), read.main_frame.clone(), false);
            frame_ctx.state = LifeState::Ready;
            manager.frames.insert(frame_id.clone(), Arc::new(RwLock::new(frame_ctx)));
            frame_id
        };

        manager.frame_focus(target.clone(), frame_id.clone()).await.unwrap();
        let exec = manager
            .route_resolve(Some(RoutingHint { target: Some(target.clone()), ..Default::default() }))
            .await
            .unwrap();

        assert_eq!(exec.frame, frame_id);
    }

    #[tokio::test]
    async fn frame_attach_records_parent_child() {
        let manager = new_manager().await;
        let (_session, target) = manager.launch("user").await.unwrap();

        let main_frame = manager.ensure_target(&target).unwrap().read().main_frame.clone().unwrap();

        let child = manager.frame_attached(&target, Some(main_frame.clone()), false).unwrap();

        let main_ctx = manager.ensure_frame(&main_frame).unwrap();
        assert_eq!(main_ctx.read().children, vec![child.clone()]);

        manager.frame_detached(&child).unwrap();

        let main_ctx = manager.ensure_frame(&main_frame).unwrap();
        assert!(main_ctx.read().children.is_empty());
        assert!(manager.frames.get(&child).is_none());
    }

    #[tokio::test]
    async fn closing_focused_target_reassigns_focus() {
        let manager = new_manager().await;
        let (session, target_a) = manager.launch("user").await.unwrap();
        let target_b = manager.navigate(target_a.clone(), "about:blank", true, Duration::from_secs(5)).await.unwrap();

        manager.switch_to(target_b.clone()).await.unwrap();
        manager.close_target(target_b).await.unwrap();

        let exec = manager.route_resolve(None).await.unwrap();
        assert_eq!(exec.target, target_a);
        assert_eq!(manager.current_target(&session), Some(target_a));
    }

    #[tokio::test]
    async fn closing_last_target_returns_error_on_route() {
        let manager = new_manager().await;
        let (_session, target) = manager.launch("user").await.unwrap();

        manager.close_target(target).await.unwrap();

        let err = manager.route_resolve(None).await.err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("no sessions") || msg.contains("no targets"));
    }
}
