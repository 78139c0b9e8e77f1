#![forbid(unsafe_code)]

//! Breakpoint state: the single source of truth for the viewport regime.
//!
//! [`BreakpointState`] holds the last authoritative viewport dimensions, the
//! mode derived from them, and the bookkeeping for an in-flight transition.
//!
//! # Invariants
//!
//! 1. `mode` is always `policy.mode_for(current_width)`.
//! 2. `update_dimensions` with unchanged width and height is a no-op.
//! 3. At most one transition is in flight; a second request returns
//!    [`TransitionRequest::Busy`] without touching any state.
//! 4. `complete_transition` clears the in-flight flag on every exit path,
//!    including when the restore step fails.
//! 5. A failed restore never rolls the mode back.
//!
//! # Failure Modes
//!
//! - **Host never ticks**: if the settle deadline is never observed, the
//!   state stays transitioning. There is no watchdog.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::mode::{BreakpointPolicy, NavigationMode};
use crate::viewport::ViewportSample;

/// Default divergence between authoritative and live width that counts as drift.
pub const DEFAULT_DRIFT_TOLERANCE_PX: u32 = 10;

/// User-visible state captured before a mode switch and re-applied after it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreservedUiState {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub sidebar_collapsed: bool,
    pub captured_at_ms: u64,
}

/// A mode change produced by an authoritative dimension update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub from: NavigationMode,
    pub to: NavigationMode,
    pub width: u32,
    pub height: u32,
    /// The new width sits within the boundary tolerance of the threshold.
    pub exact_boundary: bool,
    pub at_ms: u64,
}

/// Outcome of [`BreakpointState::request_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRequest {
    /// The guard was taken; the transition settles at `deadline_ms`.
    Started { deadline_ms: u64 },
    /// Another transition is in flight. Nothing changed.
    Busy,
}

/// Authoritative and live widths disagree by more than the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointDrift {
    pub authoritative_width: u32,
    pub live_width: u32,
    pub delta: u32,
}

/// Serializable view of the state for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointSnapshot {
    pub threshold: u32,
    pub current_width: u32,
    pub current_height: u32,
    pub visual_width: u32,
    pub visual_height: u32,
    pub mode: NavigationMode,
    pub previous_mode: Option<NavigationMode>,
    pub is_transitioning: bool,
    pub transition_reason: Option<String>,
    pub transition_deadline_ms: Option<u64>,
    pub exact_boundary: bool,
    pub preserved_ui_state: Option<PreservedUiState>,
}

#[derive(Debug, Clone)]
struct InFlight {
    reason: String,
    deadline_ms: u64,
}

/// Viewport regime bookkeeping and the transition guard.
#[derive(Debug, Clone)]
pub struct BreakpointState {
    policy: BreakpointPolicy,
    current_width: u32,
    current_height: u32,
    visual_width: u32,
    visual_height: u32,
    mode: NavigationMode,
    previous_mode: Option<NavigationMode>,
    in_flight: Option<InFlight>,
    preserved: Option<PreservedUiState>,
    last_sample: ViewportSample,
}

impl BreakpointState {
    /// Create the state from the viewport observed at mount.
    #[must_use]
    pub fn new(policy: BreakpointPolicy, initial: ViewportSample) -> Self {
        Self {
            policy,
            current_width: initial.width,
            current_height: initial.height,
            visual_width: initial.width,
            visual_height: initial.height,
            mode: policy.mode_for(initial.width),
            previous_mode: None,
            in_flight: None,
            preserved: None,
            last_sample: initial,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> BreakpointPolicy {
        self.policy
    }

    #[must_use]
    pub const fn mode(&self) -> NavigationMode {
        self.mode
    }

    #[must_use]
    pub const fn previous_mode(&self) -> Option<NavigationMode> {
        self.previous_mode
    }

    #[must_use]
    pub const fn current_width(&self) -> u32 {
        self.current_width
    }

    #[must_use]
    pub const fn current_height(&self) -> u32 {
        self.current_height
    }

    /// Throttled dimensions for visual feedback. Never used to decide mode.
    #[must_use]
    pub const fn visual_dimensions(&self) -> (u32, u32) {
        (self.visual_width, self.visual_height)
    }

    #[must_use]
    pub const fn last_sample(&self) -> ViewportSample {
        self.last_sample
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn transition_deadline_ms(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|f| f.deadline_ms)
    }

    #[must_use]
    pub fn transition_reason(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.reason.as_str())
    }

    /// Whether the in-flight transition's settle deadline has passed.
    #[must_use]
    pub fn is_settle_due(&self, now_ms: u64) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| now_ms >= f.deadline_ms)
    }

    /// Update the throttled visual dimensions only.
    pub fn set_visual_dimensions(&mut self, width: u32, height: u32) {
        self.visual_width = width;
        self.visual_height = height;
    }

    /// Apply an authoritative sample and recompute the mode.
    ///
    /// `capture` is invoked only when the mode changes; its result is kept as
    /// the preserved UI state for the next transition. Identical dimensions
    /// are a no-op.
    pub fn update_dimensions(
        &mut self,
        sample: ViewportSample,
        capture: impl FnOnce() -> PreservedUiState,
    ) -> Option<ModeChange> {
        if sample.width == self.current_width && sample.height == self.current_height {
            trace!(
                target: "navarb.breakpoint",
                width = sample.width,
                height = sample.height,
                "dimensions unchanged"
            );
            return None;
        }

        self.current_width = sample.width;
        self.current_height = sample.height;
        self.visual_width = sample.width;
        self.visual_height = sample.height;
        self.last_sample = sample;

        let next = self.policy.mode_for(sample.width);
        if next == self.mode {
            return None;
        }

        let change = ModeChange {
            from: self.mode,
            to: next,
            width: sample.width,
            height: sample.height,
            exact_boundary: self.policy.is_exact_boundary(sample.width),
            at_ms: sample.timestamp_ms,
        };
        self.previous_mode = Some(self.mode);
        self.mode = next;
        self.preserved = Some(capture());

        debug!(
            target: "navarb.breakpoint",
            from = %change.from,
            to = %change.to,
            width = change.width,
            exact_boundary = change.exact_boundary,
            "navigation mode changed"
        );
        Some(change)
    }

    /// Take the transition guard.
    ///
    /// Concurrent requests are rejected, not queued.
    pub fn request_transition(
        &mut self,
        reason: impl Into<String>,
        now_ms: u64,
        settle_ms: u64,
    ) -> TransitionRequest {
        if let Some(in_flight) = &self.in_flight {
            debug!(
                target: "navarb.breakpoint",
                in_flight = %in_flight.reason,
                "transition request rejected: busy"
            );
            return TransitionRequest::Busy;
        }
        let deadline_ms = now_ms.saturating_add(settle_ms);
        self.in_flight = Some(InFlight {
            reason: reason.into(),
            deadline_ms,
        });
        TransitionRequest::Started { deadline_ms }
    }

    /// Finish the in-flight transition.
    ///
    /// Runs `restore` with the preserved UI state (if any), then releases the
    /// guard whatever the outcome. Returns the state that was restored.
    pub fn complete_transition<E>(
        &mut self,
        restore: impl FnOnce(&PreservedUiState) -> Result<(), E>,
    ) -> Result<Option<PreservedUiState>, E> {
        let preserved = self.preserved.take();
        let outcome = match &preserved {
            Some(state) => restore(state),
            None => Ok(()),
        };
        self.in_flight = None;
        outcome.map(|()| preserved)
    }

    /// Replace the preserved UI state explicitly.
    pub fn preserve_ui_state(&mut self, state: PreservedUiState) {
        self.preserved = Some(state);
    }

    #[must_use]
    pub const fn preserved_ui_state(&self) -> Option<&PreservedUiState> {
        self.preserved.as_ref()
    }

    /// Take the preserved UI state for the host to re-apply.
    pub fn restore_preserved_state(&mut self) -> Option<PreservedUiState> {
        self.preserved.take()
    }

    /// Compare the authoritative width against the host's live width.
    #[must_use]
    pub fn detect_breakpoint_drift(&self, live_width: u32, tolerance: u32) -> Option<BreakpointDrift> {
        let delta = live_width.abs_diff(self.current_width);
        (delta > tolerance).then_some(BreakpointDrift {
            authoritative_width: self.current_width,
            live_width,
            delta,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> BreakpointSnapshot {
        BreakpointSnapshot {
            threshold: self.policy.threshold,
            current_width: self.current_width,
            current_height: self.current_height,
            visual_width: self.visual_width,
            visual_height: self.visual_height,
            mode: self.mode,
            previous_mode: self.previous_mode,
            is_transitioning: self.is_transitioning(),
            transition_reason: self.transition_reason().map(str::to_owned),
            transition_deadline_ms: self.transition_deadline_ms(),
            exact_boundary: self.policy.is_exact_boundary(self.current_width),
            preserved_ui_state: self.preserved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state_at(width: u32) -> BreakpointState {
        BreakpointState::new(BreakpointPolicy::default(), ViewportSample::new(width, 800, 0))
    }

    fn scroll(y: f64) -> impl FnOnce() -> PreservedUiState {
        move || PreservedUiState {
            scroll_y: y,
            ..PreservedUiState::default()
        }
    }

    #[test]
    fn initial_mode_from_viewport() {
        assert_eq!(state_at(1200).mode(), NavigationMode::Desktop);
        assert_eq!(state_at(600).mode(), NavigationMode::Mobile);
        assert_eq!(state_at(1024).mode(), NavigationMode::Desktop);
    }

    #[test]
    fn unchanged_dimensions_are_noop() {
        let mut state = state_at(1200);
        let mut captured = false;
        let change = state.update_dimensions(ViewportSample::new(1200, 800, 50), || {
            captured = true;
            PreservedUiState::default()
        });
        assert!(change.is_none());
        assert!(!captured);
        assert_eq!(state.last_sample().timestamp_ms, 0);
    }

    #[test]
    fn mode_change_preserves_ui_state() {
        let mut state = state_at(1200);
        let change = state
            .update_dimensions(ViewportSample::new(768, 800, 10), scroll(420.0))
            .expect("mode changed");
        assert_eq!(change.from, NavigationMode::Desktop);
        assert_eq!(change.to, NavigationMode::Mobile);
        assert_eq!(state.previous_mode(), Some(NavigationMode::Desktop));
        assert_eq!(state.preserved_ui_state().map(|s| s.scroll_y), Some(420.0));
    }

    #[test]
    fn same_mode_resize_updates_width_only() {
        let mut state = state_at(1200);
        assert!(state.update_dimensions(ViewportSample::new(1100, 700, 5), scroll(1.0)).is_none());
        assert_eq!(state.current_width(), 1100);
        assert!(state.preserved_ui_state().is_none());
    }

    #[test]
    fn concurrent_transition_is_busy() {
        let mut state = state_at(1200);
        assert_eq!(
            state.request_transition("resize", 100, 50),
            TransitionRequest::Started { deadline_ms: 150 }
        );
        let mode_before = state.mode();
        assert_eq!(state.request_transition("again", 110, 50), TransitionRequest::Busy);
        assert!(state.is_transitioning());
        assert_eq!(state.mode(), mode_before);
        assert_eq!(state.transition_reason(), Some("resize"));
        assert!(!state.is_settle_due(149));
        assert!(state.is_settle_due(150));
    }

    #[test]
    fn failed_restore_still_releases_guard() {
        let mut state = state_at(1200);
        state.update_dimensions(ViewportSample::new(700, 800, 1), scroll(10.0));
        state.request_transition("resize", 1, 50);
        let result: Result<_, &str> = state.complete_transition(|_| Err("restore failed"));
        assert_eq!(result, Err("restore failed"));
        assert!(!state.is_transitioning());
        assert_eq!(state.mode(), NavigationMode::Mobile);
    }

    #[test]
    fn restore_receives_preserved_state() {
        let mut state = state_at(1200);
        state.update_dimensions(ViewportSample::new(700, 800, 1), scroll(333.0));
        state.request_transition("resize", 1, 50);
        let mut seen = None;
        let restored = state
            .complete_transition::<()>(|s| {
                seen = Some(s.scroll_y);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, Some(333.0));
        assert_eq!(restored.map(|s| s.scroll_y), Some(333.0));
        assert!(state.preserved_ui_state().is_none());
    }

    #[test]
    fn drift_requires_more_than_tolerance() {
        let state = state_at(1200);
        assert!(state.detect_breakpoint_drift(1210, DEFAULT_DRIFT_TOLERANCE_PX).is_none());
        let drift = state
            .detect_breakpoint_drift(1189, DEFAULT_DRIFT_TOLERANCE_PX)
            .expect("drift");
        assert_eq!(drift.delta, 11);
    }

    #[test]
    fn snapshot_reflects_transition() {
        let mut state = state_at(1030);
        state.request_transition("manual", 0, 40);
        let snap = state.snapshot();
        assert!(snap.is_transitioning);
        assert!(snap.exact_boundary);
        assert_eq!(snap.transition_deadline_ms, Some(40));
    }
}
