#![forbid(unsafe_code)]

//! The navigation controller state machine.
//!
//! ```text
//!            breakpoint change (guard free)
//!   Idle(m) ───────────────────────────────► Transitioning(m, m')
//!     ▲                                             │
//!     │            settle deadline reached          │
//!     └─────────────────────────────────────────────┘
//!
//!   Idle | Transitioning ── component error ──► Fallback(reason)
//!   Fallback ── recovery mount succeeds ──► Idle(current mode)
//! ```
//!
//! The controller is host-driven: the host forwards viewport callbacks and
//! calls [`NavigationController::tick`] with the current time. Debounce,
//! settle, automatic recovery, and the drift self-check all happen inside
//! `tick`; nothing blocks or spawns.
//!
//! # Invariants
//!
//! 1. A transition can only begin from `Idle`. A mode change observed while
//!    transitioning is deferred and re-evaluated right after settle.
//! 2. The transition guard is released on every exit path, including a failed
//!    restore and a mount failure.
//! 3. A failed restore never rolls the mode back.
//! 4. Conflict detection runs only after a transition has fully settled.
//! 5. No public method returns an error or panics on host failure; failures
//!    are logged to the monitor and to `tracing`.

use navarb_core::{
    BreakpointPolicy, BreakpointState, LayoutVars, ModeChange, NavigationMode, PreservedUiState,
    ResizeDebouncer, TransitionRequest, ViewportSample,
};
use navarb_monitor::MonitorEventKind;
use navarb_registry::{DetectionContext, ResolutionReport};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, info_span, warn};

use crate::config::NavigationConfig;
use crate::error::{ComponentError, NavError, Result};
use crate::fallback::{FallbackNavigation, RecoveryDecision, RecoveryGuard, RecoveryStatus};
use crate::host::{NavigationSurface, ViewportHost};
use crate::listeners::{ControllerEvent, EventBus, Subscription};
use crate::services::NavigationServices;

/// Upper bound on settle/re-evaluate rounds within one tick.
const MAX_SETTLE_ROUNDS: usize = 4;

/// Controller lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerState {
    Idle {
        mode: NavigationMode,
    },
    Transitioning {
        from: NavigationMode,
        to: NavigationMode,
        deadline_ms: u64,
    },
    Fallback {
        reason: String,
    },
}

impl ControllerState {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }

    #[must_use]
    pub const fn is_transitioning(&self) -> bool {
        matches!(self, Self::Transitioning { .. })
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Emissions from a mounted navigation component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ComponentEvent {
    Navigate { route: String },
    ToggleCollapse,
    /// The component finished loading.
    Loaded { duration_ms: u64 },
    Action {
        name: String,
        #[serde(default)]
        detail: serde_json::Value,
    },
    /// The component threw while rendering.
    Error { message: String },
}

/// The component this controller currently has mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountedComponent {
    pub id: String,
    pub kind: NavigationMode,
    pub mounted_at_ms: u64,
}

/// Serializable view of the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    pub mode: NavigationMode,
    pub route: String,
    pub sidebar_collapsed: bool,
    pub mounted: Option<MountedComponent>,
    pub fallback: Option<FallbackNavigation>,
    pub recovery: RecoveryStatus,
    pub layout: LayoutVars,
    pub deferred_reevaluation: bool,
    pub pending_resize: bool,
    pub unmounted: bool,
}

/// Builder for [`NavigationController`].
#[derive(Debug)]
pub struct ControllerBuilder {
    config: NavigationConfig,
    services: NavigationServices,
    route: String,
    collapsed: bool,
}

impl ControllerBuilder {
    /// Route of the page the controller is mounted on.
    #[must_use]
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Initial sidebar collapse state.
    #[must_use]
    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Mount the controller against a host, using `initial` as the first
    /// authoritative viewport sample.
    pub fn mount(
        self,
        viewport: Box<dyn ViewportHost>,
        surface: Box<dyn NavigationSurface>,
        initial: ViewportSample,
    ) -> NavigationController {
        let policy: BreakpointPolicy = self.config.breakpoint_policy();
        let breakpoint = BreakpointState::new(policy, initial);
        let mode = breakpoint.mode();
        let mut controller = NavigationController {
            debouncer: ResizeDebouncer::new(self.config.debounce()),
            recovery: RecoveryGuard::new(
                self.config.recovery.auto_retry,
                self.config.recovery.loop_window_ms,
            ),
            config: self.config,
            services: self.services,
            viewport,
            surface,
            breakpoint,
            state: ControllerState::Idle { mode },
            bus: EventBus::new(),
            route: self.route,
            collapsed: self.collapsed,
            mounted: None,
            fallback: None,
            deferred: false,
            unmounted: false,
        };
        controller.initial_mount(initial.timestamp_ms);
        controller
    }
}

/// Decides which navigation component is mounted and keeps it consistent.
pub struct NavigationController {
    config: NavigationConfig,
    services: NavigationServices,
    viewport: Box<dyn ViewportHost>,
    surface: Box<dyn NavigationSurface>,
    breakpoint: BreakpointState,
    debouncer: ResizeDebouncer,
    state: ControllerState,
    bus: EventBus,
    route: String,
    collapsed: bool,
    mounted: Option<MountedComponent>,
    recovery: RecoveryGuard,
    fallback: Option<FallbackNavigation>,
    deferred: bool,
    unmounted: bool,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("state", &self.state)
            .field("route", &self.route)
            .field("collapsed", &self.collapsed)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl NavigationController {
    #[must_use]
    pub fn builder(config: NavigationConfig, services: NavigationServices) -> ControllerBuilder {
        let route = config.fallback.initial_route.clone();
        ControllerBuilder {
            config,
            services,
            route,
            collapsed: false,
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Current authoritative mode.
    #[must_use]
    pub fn mode(&self) -> NavigationMode {
        self.breakpoint.mode()
    }

    #[must_use]
    pub fn breakpoint(&self) -> &BreakpointState {
        &self.breakpoint
    }

    #[must_use]
    pub fn fallback(&self) -> Option<&FallbackNavigation> {
        self.fallback.as_ref()
    }

    #[must_use]
    pub fn mounted(&self) -> Option<&MountedComponent> {
        self.mounted.as_ref()
    }

    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    #[must_use]
    pub fn services(&self) -> &NavigationServices {
        &self.services
    }

    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    #[must_use]
    pub fn recovery_status(&self) -> RecoveryStatus {
        self.recovery.status()
    }

    /// Earliest time at which `tick` has work to do.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        [
            self.debouncer.next_deadline_ms(),
            self.breakpoint.transition_deadline_ms(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Layout custom properties for the current mode and collapse state.
    #[must_use]
    pub fn layout_vars(&self) -> LayoutVars {
        LayoutVars::compute(&self.config.layout, self.mode(), self.collapsed)
    }

    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state.clone(),
            mode: self.mode(),
            route: self.route.clone(),
            sidebar_collapsed: self.collapsed,
            mounted: self.mounted.clone(),
            fallback: self.fallback.clone(),
            recovery: self.recovery.status(),
            layout: self.layout_vars(),
            deferred_reevaluation: self.deferred,
            pending_resize: self.debouncer.has_pending(),
            unmounted: self.unmounted,
        }
    }

    // -- Inbound ------------------------------------------------------------

    /// Subscribe to outbound events.
    pub fn subscribe(&self, callback: impl Fn(&ControllerEvent) + 'static) -> Subscription {
        self.bus.subscribe(callback)
    }

    /// Raw viewport resize callback. Debounced; only visual dimensions update
    /// immediately.
    pub fn on_resize(&mut self, width: u32, height: u32, now_ms: u64) {
        if self.unmounted {
            return;
        }
        let sample = ViewportSample::new(width, height, now_ms);
        if let Some(visual) = self.debouncer.push(sample) {
            self.breakpoint.set_visual_dimensions(visual.width, visual.height);
        }
    }

    /// Orientation change. Discrete, so it bypasses the debounce window.
    pub fn on_orientation_change(&mut self, width: u32, height: u32, now_ms: u64) {
        if self.unmounted {
            return;
        }
        self.debouncer.push(ViewportSample::new(width, height, now_ms));
        if let Some(sample) = self.debouncer.flush() {
            self.apply_sample(sample, "orientation", now_ms);
        }
        self.settle_due(now_ms);
    }

    /// Advance time: fire the debounce, settle a due transition, run the
    /// automatic recovery retry, and check for drift.
    pub fn tick(&mut self, now_ms: u64) {
        if self.unmounted {
            return;
        }
        // A fallback entered during this tick retries on the next one.
        let was_fallback = self.state.is_fallback();
        if let Some(sample) = self.debouncer.poll(now_ms) {
            self.apply_sample(sample, "resize", now_ms);
        }
        self.settle_due(now_ms);

        if was_fallback && self.state.is_fallback() && self.recovery.take_auto_retry() {
            self.attempt_recovery("auto_retry", now_ms);
        }

        if self.state.is_idle() && !self.debouncer.has_pending() {
            self.check_drift(now_ms);
        }
    }

    /// The page navigated. Also an external recovery trigger.
    pub fn set_route(&mut self, route: impl Into<String>, now_ms: u64) {
        if self.unmounted {
            return;
        }
        self.route = route.into();
        if let Some(fallback) = &mut self.fallback {
            fallback.active_route = self.route.clone();
        }
        if self.state.is_fallback() {
            self.recovery.external_trigger();
            self.attempt_recovery("route_change", now_ms);
        }
    }

    /// Set the sidebar collapse state from the page.
    pub fn set_collapsed(&mut self, collapsed: bool, now_ms: u64) {
        if self.unmounted || self.collapsed == collapsed {
            return;
        }
        self.collapsed = collapsed;
        debug!(target: "navarb.controller", collapsed, now_ms, "collapse changed");
        if self.state.is_idle() && self.mode() == NavigationMode::Desktop {
            self.apply_layout_logged(self.mode(), now_ms);
        }
        self.bus.emit(&ControllerEvent::CollapseChange { collapsed });
        self.emit_state_change(self.mode());
    }

    /// Toggle the sidebar. Returns the new collapse state.
    pub fn toggle_collapsed(&mut self, now_ms: u64) -> bool {
        if self.unmounted {
            return self.collapsed;
        }
        let next = !self.collapsed;
        self.services.monitor.log_user_action(
            "toggle_collapse",
            json!({ "collapsed": next, "navigation_type": self.mode() }),
            now_ms,
        );
        self.set_collapsed(next, now_ms);
        self.collapsed
    }

    /// A concrete component reported a failure.
    pub fn report_component_error(&mut self, message: &str, now_ms: u64) {
        if self.unmounted {
            return;
        }
        let component = self
            .mounted
            .as_ref()
            .map_or_else(|| self.mode().to_string(), |m| m.id.clone());
        self.enter_fallback(&ComponentError::render(component, message), now_ms);
    }

    /// Forward an emission from the mounted component.
    pub fn on_component_event(&mut self, event: ComponentEvent, now_ms: u64) {
        if self.unmounted {
            return;
        }
        match event {
            ComponentEvent::Navigate { route } => {
                self.services
                    .monitor
                    .log_user_action("navigate", json!({ "route": route }), now_ms);
                self.route.clone_from(&route);
                self.bus.emit(&ControllerEvent::Navigate { route });
            }
            ComponentEvent::ToggleCollapse => {
                self.toggle_collapsed(now_ms);
            }
            ComponentEvent::Loaded { duration_ms } => {
                self.services
                    .monitor
                    .log_navigation_load(self.mode(), duration_ms, now_ms);
            }
            ComponentEvent::Action { name, detail } => {
                self.services.monitor.log_user_action(&name, detail, now_ms);
            }
            ComponentEvent::Error { message } => self.report_component_error(&message, now_ms),
        }
    }

    /// Manual reload: remount the component for the current mode.
    pub fn reload(&mut self, now_ms: u64) {
        if self.unmounted {
            return;
        }
        info!(target: "navarb.controller", now_ms, "reload requested");
        if self.state.is_fallback() {
            self.recovery.external_trigger();
            self.attempt_recovery("reload", now_ms);
            return;
        }
        let in_flight = match self.state {
            ControllerState::Transitioning { from, .. } => Some(from),
            _ => None,
        };
        if self.breakpoint.is_transitioning() {
            self.release_guard(now_ms);
        }
        self.deferred = false;
        let mode = self.mode();
        // The reload cuts the settle short; listeners still see the swap.
        if let Some(from) = in_flight
            && from != mode
        {
            self.bus.emit(&ControllerEvent::NavigationTypeChange {
                from,
                to: mode,
                breakpoint: self.breakpoint.current_width(),
                timestamp_ms: now_ms,
            });
        }
        match self.mount_component(mode, now_ms) {
            Ok(()) => {
                self.state = ControllerState::Idle { mode };
                self.apply_layout_logged(mode, now_ms);
                self.emit_state_change(mode);
                self.run_conflict_pass(mode, now_ms);
            }
            Err(err) => self.fail(err, now_ms),
        }
    }

    /// Tear down: unmount the component and drop subscribers. Further calls
    /// are ignored.
    pub fn unmount(&mut self, now_ms: u64) {
        if self.unmounted {
            return;
        }
        if self.breakpoint.is_transitioning() {
            let _ = self
                .breakpoint
                .complete_transition(|_| Ok::<(), std::convert::Infallible>(()));
        }
        self.unmount_component();
        self.debouncer.clear();
        self.bus.clear();
        self.unmounted = true;
        info!(target: "navarb.controller", now_ms, "controller unmounted");
    }

    // -- Internals ----------------------------------------------------------

    fn initial_mount(&mut self, now_ms: u64) {
        let mode = self.mode();
        let _span = info_span!(target: "navarb.controller", "initial_mount", mode = %mode).entered();
        match self.mount_component(mode, now_ms) {
            Ok(()) => {
                self.apply_layout_logged(mode, now_ms);
                self.run_conflict_pass(mode, now_ms);
            }
            Err(err) => self.fail(err, now_ms),
        }
    }

    fn apply_sample(&mut self, sample: ViewportSample, reason: &str, now_ms: u64) {
        let (scroll_x, scroll_y) = self.viewport.scroll_offset();
        let current = PreservedUiState {
            scroll_x,
            scroll_y,
            sidebar_collapsed: self.collapsed,
            captured_at_ms: now_ms,
        };
        // Keep the pre-transition capture if a transition is already in flight.
        let keep = if self.breakpoint.is_transitioning() {
            self.breakpoint.preserved_ui_state().copied()
        } else {
            None
        };
        let Some(change) = self
            .breakpoint
            .update_dimensions(sample, || keep.unwrap_or(current))
        else {
            return;
        };

        match self.state {
            ControllerState::Idle { .. } => self.begin_transition(change, reason, now_ms),
            ControllerState::Transitioning { .. } => {
                debug!(
                    target: "navarb.controller",
                    to = %change.to,
                    "transition in flight; deferring swap"
                );
                self.deferred = true;
            }
            ControllerState::Fallback { .. } => {
                // No swap happens in fallback; the capture would go stale.
                self.breakpoint.restore_preserved_state();
                debug!(
                    target: "navarb.controller",
                    to = %change.to,
                    "mode changed while in fallback"
                );
            }
        }
    }

    fn begin_transition(&mut self, change: ModeChange, reason: &str, now_ms: u64) {
        let _span = info_span!(
            target: "navarb.controller",
            "transition",
            from = %change.from,
            to = %change.to,
            width = change.width
        )
        .entered();

        if self.breakpoint.preserved_ui_state().is_none() {
            let (scroll_x, scroll_y) = self.viewport.scroll_offset();
            self.breakpoint.preserve_ui_state(PreservedUiState {
                scroll_x,
                scroll_y,
                sidebar_collapsed: self.collapsed,
                captured_at_ms: now_ms,
            });
        }

        let deadline_ms = match self
            .breakpoint
            .request_transition(reason, now_ms, self.config.timing.settle_ms)
        {
            TransitionRequest::Started { deadline_ms } => deadline_ms,
            TransitionRequest::Busy => {
                self.deferred = true;
                return;
            }
        };

        self.services.monitor.log_navigation_switch(
            change.from,
            change.to,
            change.width,
            reason,
            now_ms,
        );
        if change.exact_boundary {
            debug!(target: "navarb.controller", width = change.width, "switch at exact boundary");
        }

        if let Err(err) = self.mount_component(change.to, now_ms) {
            self.release_guard(now_ms);
            self.fail(err, now_ms);
            return;
        }

        self.state = ControllerState::Transitioning {
            from: change.from,
            to: change.to,
            deadline_ms,
        };
        info!(target: "navarb.controller", deadline_ms, "transition started");
    }

    fn settle_due(&mut self, now_ms: u64) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            if !(self.state.is_transitioning() && self.breakpoint.is_settle_due(now_ms)) {
                return;
            }
            self.settle(now_ms);
        }
    }

    fn settle(&mut self, now_ms: u64) {
        let ControllerState::Transitioning { from, to, .. } = self.state else {
            return;
        };
        let _span = info_span!(target: "navarb.controller", "settle", from = %from, to = %to).entered();

        self.release_guard(now_ms);
        self.state = ControllerState::Idle { mode: to };
        self.apply_layout_logged(to, now_ms);

        self.bus.emit(&ControllerEvent::NavigationTypeChange {
            from,
            to,
            breakpoint: self.breakpoint.current_width(),
            timestamp_ms: now_ms,
        });
        self.emit_state_change(to);

        let current = self.mode();
        let deferred = std::mem::take(&mut self.deferred);
        if current == to {
            self.run_conflict_pass(to, now_ms);
            info!(target: "navarb.controller", mode = %to, "transition settled");
        } else if self.state.is_idle() {
            debug!(target: "navarb.controller", deferred, from = %to, to = %current, "re-evaluating after settle");
            let change = ModeChange {
                from: to,
                to: current,
                width: self.breakpoint.current_width(),
                height: self.breakpoint.current_height(),
                exact_boundary: self
                    .breakpoint
                    .policy()
                    .is_exact_boundary(self.breakpoint.current_width()),
                at_ms: now_ms,
            };
            self.begin_transition(change, "deferred", now_ms);
        }
    }

    /// Restore preserved UI state and release the transition guard.
    fn release_guard(&mut self, now_ms: u64) {
        let viewport = &self.viewport;
        let restored = self
            .breakpoint
            .complete_transition(|preserved| viewport.set_scroll_offset(preserved.scroll_x, preserved.scroll_y));
        if let Err(err) = restored {
            self.log_internal(&NavError::Restore(err), now_ms);
        }
    }

    fn mount_component(&mut self, kind: NavigationMode, now_ms: u64) -> Result<()> {
        self.unmount_component();
        let id = self.surface.mount(kind, &self.route, self.collapsed)?;
        self.services.registry.register(
            &id,
            kind,
            json!({ "route": self.route, "collapsed": self.collapsed }),
            now_ms,
        );
        debug!(target: "navarb.controller", id = %id, kind = %kind, "component mounted");
        self.mounted = Some(MountedComponent {
            id,
            kind,
            mounted_at_ms: now_ms,
        });
        Ok(())
    }

    fn unmount_component(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            self.surface.unmount(&mounted.id);
            self.services.registry.unregister(&mounted.id);
            debug!(target: "navarb.controller", id = %mounted.id, "component unmounted");
        }
    }

    fn apply_layout(&self, mode: NavigationMode) -> Result<()> {
        let vars = LayoutVars::compute(&self.config.layout, mode, self.collapsed);
        for (name, value) in vars.css_properties() {
            self.viewport.set_css_var(name, &value)?;
        }
        Ok(())
    }

    fn apply_layout_logged(&self, mode: NavigationMode, now_ms: u64) {
        if let Err(err) = self.apply_layout(mode) {
            self.log_internal(&err, now_ms);
        }
    }

    /// Detect and resolve conflicts against the mounted `mode`.
    fn run_conflict_pass(&mut self, mode: NavigationMode, now_ms: u64) -> Option<ResolutionReport> {
        if !self.config.conflict.detect_after_settle {
            return None;
        }
        let expected = self.config.layout.expected_margin_left(mode, self.collapsed);
        let ctx = DetectionContext::new(mode, expected, now_ms)
            .with_margin_tolerance(self.config.conflict.margin_tolerance_px);
        let report = self.services.detector.resolve_conflicts_with(
            &self.services.registry,
            &ctx,
            || self.apply_layout(mode).is_ok(),
        );

        if let Some(mounted) = &self.mounted
            && !self.services.registry.contains(&mounted.id)
        {
            warn!(
                target: "navarb.controller",
                id = %mounted.id,
                "mounted component lost arbitration"
            );
            let id = mounted.id.clone();
            self.surface.unmount(&id);
            self.mounted = None;
        }
        if !report.is_clean() {
            info!(
                target: "navarb.controller",
                conflicts = report.conflicts.len(),
                resolved = report.resolved_count(),
                "conflict pass complete"
            );
        }
        Some(report)
    }

    fn fail(&mut self, err: NavError, now_ms: u64) {
        match err {
            NavError::Component(component) => self.enter_fallback(&component, now_ms),
            other => self.log_internal(&other, now_ms),
        }
    }

    fn enter_fallback(&mut self, err: &ComponentError, now_ms: u64) {
        let reason = err.to_string();
        warn!(target: "navarb.controller", reason = %reason, "entering fallback navigation");

        if self.breakpoint.is_transitioning() {
            self.release_guard(now_ms);
        }
        self.unmount_component();
        self.deferred = false;

        let monitor = &self.services.monitor;
        monitor.log_navigation_error(&err.component(), &reason, true, now_ms);
        let decision = self.recovery.record_failure(now_ms);
        monitor.log_recovery(
            MonitorEventKind::FallbackActivated,
            json!({ "reason": reason, "decision": decision }),
            now_ms,
        );
        if decision == RecoveryDecision::Blocked {
            monitor.log_recovery(
                MonitorEventKind::RecoveryBlocked,
                json!({
                    "reason": reason,
                    "loop_window_ms": self.config.recovery.loop_window_ms,
                }),
                now_ms,
            );
        }

        self.fallback = Some(FallbackNavigation {
            reason: reason.clone(),
            links: self.config.fallback.links.clone(),
            active_route: self.route.clone(),
            activated_at_ms: now_ms,
            recovery_blocked: self.recovery.is_blocked(),
        });
        self.state = ControllerState::Fallback { reason };
    }

    fn attempt_recovery(&mut self, trigger: &str, now_ms: u64) {
        let mode = self.mode();
        self.services.monitor.log_recovery(
            MonitorEventKind::RecoveryAttempt,
            json!({ "trigger": trigger, "navigation_type": mode }),
            now_ms,
        );
        match self.mount_component(mode, now_ms) {
            Ok(()) => {
                self.fallback = None;
                self.state = ControllerState::Idle { mode };
                self.services.monitor.log_recovery(
                    MonitorEventKind::RecoverySucceeded,
                    json!({ "trigger": trigger, "navigation_type": mode }),
                    now_ms,
                );
                info!(target: "navarb.controller", trigger, mode = %mode, "recovered from fallback");
                self.apply_layout_logged(mode, now_ms);
                self.emit_state_change(mode);
                self.run_conflict_pass(mode, now_ms);
            }
            Err(err) => self.fail(err, now_ms),
        }
    }

    fn check_drift(&mut self, now_ms: u64) {
        let Some(live_width) = self.viewport.live_width() else {
            return;
        };
        let Some(drift) = self
            .breakpoint
            .detect_breakpoint_drift(live_width, self.config.breakpoint.drift_tolerance_px)
        else {
            return;
        };
        warn!(
            target: "navarb.controller",
            authoritative = drift.authoritative_width,
            live = drift.live_width,
            "breakpoint drift; resynchronizing"
        );
        self.services
            .monitor
            .log_drift(drift.authoritative_width, drift.live_width, now_ms);
        let height = self.breakpoint.current_height();
        self.debouncer.clear();
        self.apply_sample(ViewportSample::new(live_width, height, now_ms), "drift_resync", now_ms);
        self.settle_due(now_ms);
    }

    fn emit_state_change(&self, navigation_type: NavigationMode) {
        self.bus.emit(&ControllerEvent::StateChange {
            sidebar_collapsed: self.collapsed,
            navigation_type,
        });
    }

    fn log_internal(&self, err: &NavError, now_ms: u64) {
        warn!(target: "navarb.controller", error = %err, "internal navigation error");
        self.services
            .monitor
            .log_navigation_error("controller", &err.to_string(), false, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HeadlessSurface, HeadlessViewport};
    use navarb_registry::HeadlessDom;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    struct Rig {
        dom: HeadlessDom,
        viewport: HeadlessViewport,
        surface: HeadlessSurface,
        controller: NavigationController,
    }

    fn rig_with(config: NavigationConfig, width: u32, prepare: impl FnOnce(&HeadlessSurface)) -> Rig {
        let dom = HeadlessDom::new();
        let viewport = HeadlessViewport::new(dom.clone());
        let surface = HeadlessSurface::new(dom.clone());
        prepare(&surface);
        let services = NavigationServices::new(&config, Arc::new(dom.clone()));
        let controller = NavigationController::builder(config, services).mount(
            Box::new(viewport.clone()),
            Box::new(surface.clone()),
            ViewportSample::new(width, 800, 0),
        );
        Rig {
            dom,
            viewport,
            surface,
            controller,
        }
    }

    fn rig(width: u32) -> Rig {
        rig_with(NavigationConfig::default(), width, |_| {})
    }

    #[test]
    fn initial_mount_registers_and_applies_layout() {
        let r = rig(1200);
        assert_eq!(r.controller.state(), &ControllerState::Idle { mode: NavigationMode::Desktop });
        let mounted = r.controller.mounted().unwrap();
        assert!(r.controller.services().registry.contains(&mounted.id));
        assert_eq!(r.dom.css_var("--sidebar-width").as_deref(), Some("256px"));
        assert_eq!(r.dom.css_var("--mobile-header-height").as_deref(), Some("0px"));
    }

    #[test]
    fn resize_within_mode_does_not_transition() {
        let mut r = rig(1200);
        r.controller.on_resize(1100, 800, 10);
        r.controller.tick(200);
        assert!(r.controller.state().is_idle());
        assert_eq!(r.controller.breakpoint().current_width(), 1100);
        assert_eq!(r.surface.mount_calls(), 1);
    }

    #[test]
    fn transition_swaps_component_and_settles() {
        let mut r = rig(1200);
        let events = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let events = Rc::clone(&events);
            r.controller.subscribe(move |e| events.borrow_mut().push(e.clone()))
        };
        r.controller.on_resize(768, 800, 0);
        r.controller.tick(149);
        assert!(r.controller.state().is_idle());
        r.controller.tick(150);
        assert!(r.controller.state().is_transitioning());
        assert!(events.borrow().is_empty());
        r.controller.tick(200);
        assert_eq!(r.controller.state(), &ControllerState::Idle { mode: NavigationMode::Mobile });
        assert_eq!(r.dom.css_var("--content-margin-left").as_deref(), Some("0px"));
        assert_eq!(r.dom.css_var("--mobile-bottom-nav-height").as_deref(), Some("64px"));
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            ControllerEvent::NavigationTypeChange {
                from: NavigationMode::Desktop,
                to: NavigationMode::Mobile,
                breakpoint: 768,
                ..
            }
        ));
    }

    #[test]
    fn change_during_transition_is_deferred_then_reevaluated() {
        let mut r = rig(1200);
        r.controller.on_resize(768, 800, 0);
        r.controller.tick(150);
        assert!(r.controller.state().is_transitioning());
        r.controller.on_orientation_change(1300, 800, 160);
        assert!(r.controller.state().is_transitioning());
        assert_eq!(r.controller.mode(), NavigationMode::Desktop);
        r.controller.tick(200);
        assert!(r.controller.state().is_transitioning());
        r.controller.tick(250);
        assert_eq!(r.controller.state(), &ControllerState::Idle { mode: NavigationMode::Desktop });
        assert_eq!(r.controller.mounted().unwrap().kind, NavigationMode::Desktop);
        assert_eq!(r.controller.services().registry.len(), 1);
    }

    #[test]
    fn reload_mid_transition_reports_the_swap() {
        let mut r = rig(1200);
        let events = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let events = Rc::clone(&events);
            r.controller.subscribe(move |e| events.borrow_mut().push(e.clone()))
        };
        r.controller.on_resize(768, 800, 0);
        r.controller.tick(150);
        assert!(r.controller.state().is_transitioning());

        r.controller.reload(170);
        assert_eq!(r.controller.state(), &ControllerState::Idle { mode: NavigationMode::Mobile });
        assert!(!r.controller.breakpoint().is_transitioning());
        let changes: Vec<ControllerEvent> = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, ControllerEvent::NavigationTypeChange { .. }))
            .cloned()
            .collect();
        assert_eq!(
            changes,
            vec![ControllerEvent::NavigationTypeChange {
                from: NavigationMode::Desktop,
                to: NavigationMode::Mobile,
                breakpoint: 768,
                timestamp_ms: 170,
            }]
        );

        r.controller.tick(400);
        assert_eq!(
            events
                .borrow()
                .iter()
                .filter(|e| matches!(e, ControllerEvent::NavigationTypeChange { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn scroll_restored_after_settle() {
        let mut r = rig(1200);
        r.viewport.scroll_to(0.0, 640.0);
        r.controller.on_resize(700, 800, 0);
        r.controller.tick(150);
        r.viewport.scroll_to(0.0, 0.0);
        r.controller.tick(200);
        assert_eq!(r.viewport.scroll_offset(), (0.0, 640.0));
    }

    #[test]
    fn failed_restore_still_releases_guard() {
        let mut r = rig(1200);
        r.controller.on_resize(700, 800, 0);
        r.controller.tick(150);
        r.viewport.fail_scroll_writes(true);
        r.controller.tick(200);
        assert!(r.controller.state().is_idle());
        assert!(!r.controller.breakpoint().is_transitioning());
        assert_eq!(r.controller.mode(), NavigationMode::Mobile);
        let errors = r.controller.services().monitor.events_of(MonitorEventKind::NavigationError);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn collapse_updates_layout_and_emits() {
        let mut r = rig(1200);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let seen = Rc::clone(&seen);
            r.controller.subscribe(move |e| seen.borrow_mut().push(e.clone()))
        };
        assert!(r.controller.toggle_collapsed(5));
        assert_eq!(r.dom.css_var("--sidebar-width").as_deref(), Some("64px"));
        assert_eq!(r.dom.css_var("--content-margin-left").as_deref(), Some("64px"));
        assert_eq!(seen.borrow()[0], ControllerEvent::CollapseChange { collapsed: true });
        r.controller.set_collapsed(true, 6);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn initial_mount_failure_enters_fallback() {
        let r = rig_with(NavigationConfig::default(), 1200, |s| s.fail_next_mounts(1));
        assert!(r.controller.state().is_fallback());
        let fallback = r.controller.fallback().unwrap();
        assert_eq!(fallback.links.len(), 5);
        assert_eq!(fallback.active_route, "/dashboard");
        assert!(r.controller.services().registry.is_empty());
    }

    #[test]
    fn drift_forces_resync() {
        let mut r = rig(1200);
        r.viewport.set_live_width(Some(800));
        r.controller.tick(10);
        assert_eq!(r.controller.breakpoint().current_width(), 800);
        assert_eq!(r.controller.mode(), NavigationMode::Mobile);
        let drift = r.controller.services().monitor.events_of(MonitorEventKind::BreakpointDrift);
        assert_eq!(drift.len(), 1);
        r.controller.tick(60);
        assert_eq!(r.controller.state(), &ControllerState::Idle { mode: NavigationMode::Mobile });
    }

    #[test]
    fn small_drift_is_ignored() {
        let mut r = rig(1200);
        r.viewport.set_live_width(Some(1205));
        r.controller.tick(10);
        assert_eq!(r.controller.breakpoint().current_width(), 1200);
    }

    #[test]
    fn unmount_is_terminal() {
        let mut r = rig(1200);
        r.controller.unmount(5);
        assert!(r.controller.services().registry.is_empty());
        assert!(r.surface.mounted().is_empty());
        r.controller.on_resize(600, 800, 10);
        r.controller.tick(500);
        assert_eq!(r.controller.mode(), NavigationMode::Desktop);
        assert!(r.controller.snapshot().unmounted);
    }

    #[test]
    fn component_events_are_logged() {
        let mut r = rig(1200);
        r.controller.on_component_event(ComponentEvent::Loaded { duration_ms: 40 }, 1);
        r.controller.on_component_event(
            ComponentEvent::Navigate {
                route: "/leave".into(),
            },
            2,
        );
        assert_eq!(r.controller.route(), "/leave");
        let monitor = &r.controller.services().monitor;
        assert_eq!(monitor.events_of(MonitorEventKind::NavigationLoad).len(), 1);
        assert_eq!(monitor.events_of(MonitorEventKind::UserAction).len(), 1);
    }

    #[test]
    fn next_deadline_tracks_pending_work() {
        let mut r = rig(1200);
        assert_eq!(r.controller.next_deadline_ms(), None);
        r.controller.on_resize(700, 800, 10);
        assert_eq!(r.controller.next_deadline_ms(), Some(160));
    }
}
