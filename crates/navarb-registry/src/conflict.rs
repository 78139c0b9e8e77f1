#![forbid(unsafe_code)]

//! Single-owner conflict detection and resolution.
//!
//! Compares what the [`ComponentRegistry`] claims against what the
//! [`VisibilityProbe`] reports, flags violations of "exactly one navigation
//! kind, exactly one instance", and repairs them deterministically.
//!
//! # Invariants
//!
//! 1. [`ConflictDetector::detect_conflicts`] never mutates the registry or probe.
//! 2. For duplicates of one kind the most recent registration wins
//!    (`registered_at_ms`, then `sequence`).
//! 3. Nodes hidden by resolution are marked and never re-flagged.
//! 4. A resolve pass over a clean state logs nothing.
//! 5. A layout mismatch counts as resolved only once the probe measures the
//!    expected margin again.
//!
//! # Failure Modes
//!
//! - **Layout mismatch that does not settle**: `dom_mismatch` stays in
//!   [`DetectorStatus::unresolved`]. It is logged once; later passes that
//!   measure the same margin retry the resync quietly.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use navarb_core::NavigationMode;
use navarb_monitor::NavigationMonitor;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, debug_span, info};

use crate::probe::{ProbeNode, VisibilityProbe};
use crate::registry::{ComponentRegistry, Registration};

/// Default content margin tolerance, in pixels.
pub const DEFAULT_MARGIN_TOLERANCE_PX: f64 = 1.0;

const HISTORY_CAP: usize = 100;

/// Kind of single-owner violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    MultipleDesktop,
    MultipleMobile,
    BothTypesVisible,
    DomMismatch,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MultipleDesktop => "multiple_desktop",
            Self::MultipleMobile => "multiple_mobile",
            Self::BothTypesVisible => "both_types_visible",
            Self::DomMismatch => "dom_mismatch",
        }
    }

    const fn multiple(kind: NavigationMode) -> Self {
        match kind {
            NavigationMode::Desktop => Self::MultipleDesktop,
            NavigationMode::Mobile => Self::MultipleMobile,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken to resolve a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Duplicates removed; `kept` is the surviving instance, if any.
    KeptMostRecent {
        kept: Option<String>,
        removed: Vec<String>,
    },
    /// Every instance of the kind that does not match the current mode was
    /// hidden and unregistered.
    HidInactiveKind {
        kind: NavigationMode,
        hidden: Vec<String>,
    },
    /// Layout custom properties were re-applied.
    ResyncLayout { expected: f64, observed: f64 },
}

/// One detected violation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub detected_at_ms: u64,
    pub involved_ids: Vec<String>,
    pub resolution: Option<ConflictResolution>,
}

/// Inputs a detection pass needs from the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionContext {
    /// Current authoritative mode.
    pub mode: NavigationMode,
    /// Content margin the current mode implies.
    pub expected_margin_left: f64,
    pub margin_tolerance: f64,
    pub now_ms: u64,
}

impl DetectionContext {
    #[must_use]
    pub const fn new(mode: NavigationMode, expected_margin_left: f64, now_ms: u64) -> Self {
        Self {
            mode,
            expected_margin_left,
            margin_tolerance: DEFAULT_MARGIN_TOLERANCE_PX,
            now_ms,
        }
    }

    #[must_use]
    pub const fn with_margin_tolerance(mut self, tolerance: f64) -> Self {
        self.margin_tolerance = tolerance;
        self
    }
}

/// Result of [`ConflictDetector::resolve_conflicts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub conflicts: Vec<ConflictRecord>,
}

impl ResolutionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.conflicts.iter().filter(|c| c.resolution.is_some()).count()
    }

    #[must_use]
    pub fn unresolved(&self) -> Vec<&ConflictRecord> {
        self.conflicts.iter().filter(|c| c.resolution.is_none()).collect()
    }

    #[must_use]
    pub fn contains(&self, kind: ConflictKind) -> bool {
        self.conflicts.iter().any(|c| c.kind == kind)
    }
}

/// Detector diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorStatus {
    pub detections_run: u64,
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
    pub last_detection_at_ms: Option<u64>,
    /// Conflicts found by the latest pass that are still unresolved.
    pub unresolved: Vec<ConflictRecord>,
    /// Most recent records, oldest first.
    pub history: Vec<ConflictRecord>,
}

#[derive(Debug, Default)]
struct DetectorState {
    detections_run: u64,
    conflicts_detected: u64,
    conflicts_resolved: u64,
    last_detection_at_ms: Option<u64>,
    unresolved: Vec<ConflictRecord>,
    history: VecDeque<ConflictRecord>,
    /// `(expected, observed)` of the last logged mismatch still unresolved.
    logged_mismatch: Option<(f64, f64)>,
}

/// Shared conflict detector.
#[derive(Clone)]
pub struct ConflictDetector {
    monitor: NavigationMonitor,
    probe: Arc<dyn VisibilityProbe + Send + Sync>,
    state: Arc<Mutex<DetectorState>>,
}

impl fmt::Debug for ConflictDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictDetector")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_owned());
    }
}

impl ConflictDetector {
    #[must_use]
    pub fn new(monitor: NavigationMonitor, probe: Arc<dyn VisibilityProbe + Send + Sync>) -> Self {
        Self {
            monitor,
            probe,
            state: Arc::new(Mutex::new(DetectorState::default())),
        }
    }

    #[must_use]
    pub fn probe(&self) -> Arc<dyn VisibilityProbe + Send + Sync> {
        Arc::clone(&self.probe)
    }

    fn lock(&self) -> MutexGuard<'_, DetectorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// A registration counts as visible unless the probe says otherwise.
    fn registration_visible(&self, registration: &Registration) -> bool {
        self.probe.is_visible(&registration.id).unwrap_or(true)
    }

    fn scan(&self, registry: &ComponentRegistry, ctx: &DetectionContext) -> Vec<ConflictRecord> {
        let nodes = self.probe.tagged_nodes();
        let mut records = Vec::new();
        let mut present: Vec<Vec<String>> = Vec::with_capacity(2);

        for kind in NavigationMode::ALL {
            let registered = registry.by_kind(kind);
            let live_nodes: Vec<&ProbeNode> =
                nodes.iter().filter(|n| n.kind == kind && n.is_live()).collect();

            if registered.len() > 1 || live_nodes.len() > 1 {
                let mut ids = Vec::new();
                for r in &registered {
                    push_unique(&mut ids, &r.id);
                }
                for n in &live_nodes {
                    push_unique(&mut ids, &n.id);
                }
                records.push(ConflictRecord {
                    kind: ConflictKind::multiple(kind),
                    detected_at_ms: ctx.now_ms,
                    involved_ids: ids,
                    resolution: None,
                });
            }

            let mut visible = Vec::new();
            for r in registered.iter().filter(|r| self.registration_visible(r)) {
                push_unique(&mut visible, &r.id);
            }
            for n in &live_nodes {
                push_unique(&mut visible, &n.id);
            }
            present.push(visible);
        }

        if present.iter().all(|ids| !ids.is_empty()) {
            records.push(ConflictRecord {
                kind: ConflictKind::BothTypesVisible,
                detected_at_ms: ctx.now_ms,
                involved_ids: present.concat(),
                resolution: None,
            });
        }

        if let Some(observed) = self.probe.content_margin_left()
            && (observed - ctx.expected_margin_left).abs() > ctx.margin_tolerance
        {
            records.push(ConflictRecord {
                kind: ConflictKind::DomMismatch,
                detected_at_ms: ctx.now_ms,
                involved_ids: Vec::new(),
                resolution: None,
            });
        }

        records
    }

    /// Detect violations without changing anything.
    pub fn detect_conflicts(
        &self,
        registry: &ComponentRegistry,
        ctx: &DetectionContext,
    ) -> Vec<ConflictRecord> {
        let _span = debug_span!(target: "navarb.conflict", "detect", now_ms = ctx.now_ms).entered();
        let records = self.scan(registry, ctx);
        let mut state = self.lock();
        state.detections_run += 1;
        state.last_detection_at_ms = Some(ctx.now_ms);
        state.unresolved = records.clone();
        debug!(target: "navarb.conflict", conflicts = records.len(), "detection pass");
        records
    }

    /// Detect and repair. A layout mismatch stays unresolved; use
    /// [`Self::resolve_conflicts_with`] to supply a layout resync.
    pub fn resolve_conflicts(
        &self,
        registry: &ComponentRegistry,
        ctx: &DetectionContext,
    ) -> ResolutionReport {
        self.resolve_conflicts_with(registry, ctx, || false)
    }

    /// Detect and repair, calling `resync_layout` for a layout mismatch.
    ///
    /// `resync_layout` returns whether the layout was re-applied.
    pub fn resolve_conflicts_with(
        &self,
        registry: &ComponentRegistry,
        ctx: &DetectionContext,
        mut resync_layout: impl FnMut() -> bool,
    ) -> ResolutionReport {
        let _span = debug_span!(target: "navarb.conflict", "resolve", now_ms = ctx.now_ms).entered();
        let logged_mismatch = self.lock().logged_mismatch;
        let repeated_mismatch = logged_mismatch.is_some()
            && self
                .probe
                .content_margin_left()
                .map(|observed| (ctx.expected_margin_left, observed))
                == logged_mismatch;
        let mut conflicts = self.scan(registry, ctx);
        let mut newly_detected = 0u64;

        for record in &mut conflicts {
            let repeated = repeated_mismatch && record.kind == ConflictKind::DomMismatch;
            if !repeated {
                newly_detected += 1;
                self.monitor.log_conflict(
                    json!({ "type": record.kind, "involved_ids": record.involved_ids }),
                    ctx.now_ms,
                );
            }

            record.resolution = match record.kind {
                ConflictKind::MultipleDesktop => {
                    Some(self.keep_most_recent(registry, NavigationMode::Desktop))
                }
                ConflictKind::MultipleMobile => {
                    Some(self.keep_most_recent(registry, NavigationMode::Mobile))
                }
                ConflictKind::BothTypesVisible => {
                    Some(self.hide_inactive(registry, ctx.mode.opposite()))
                }
                ConflictKind::DomMismatch => self.resync(ctx, &mut resync_layout),
            };

            if let Some(resolution) = &record.resolution {
                info!(
                    target: "navarb.conflict",
                    kind = %record.kind,
                    involved = record.involved_ids.len(),
                    "conflict resolved"
                );
                self.monitor.log_conflict_resolved(
                    json!({ "type": record.kind, "resolution": resolution }),
                    ctx.now_ms,
                );
            }
        }

        let unresolved: Vec<ConflictRecord> = conflicts
            .iter()
            .filter(|c| c.resolution.is_none())
            .cloned()
            .collect();
        let pending_mismatch = unresolved
            .iter()
            .any(|c| c.kind == ConflictKind::DomMismatch)
            .then(|| {
                let observed = self.probe.content_margin_left().unwrap_or_default();
                (ctx.expected_margin_left, observed)
            });
        if repeated_mismatch {
            conflicts.retain(|c| c.kind != ConflictKind::DomMismatch || c.resolution.is_some());
        }

        let mut state = self.lock();
        state.detections_run += 1;
        state.last_detection_at_ms = Some(ctx.now_ms);
        state.conflicts_detected += newly_detected;
        state.conflicts_resolved += conflicts.iter().filter(|c| c.resolution.is_some()).count() as u64;
        state.unresolved = unresolved;
        state.logged_mismatch = pending_mismatch;
        for record in &conflicts {
            if state.history.len() >= HISTORY_CAP {
                state.history.pop_front();
            }
            state.history.push_back(record.clone());
        }
        drop(state);

        ResolutionReport { conflicts }
    }

    /// Run the resync hook, then measure again. Only a margin back within
    /// tolerance counts as resolved.
    fn resync(
        &self,
        ctx: &DetectionContext,
        resync_layout: &mut impl FnMut() -> bool,
    ) -> Option<ConflictResolution> {
        let observed = self.probe.content_margin_left().unwrap_or_default();
        if !resync_layout() {
            return None;
        }
        let settled = self
            .probe
            .content_margin_left()
            .is_none_or(|margin| (margin - ctx.expected_margin_left).abs() <= ctx.margin_tolerance);
        if !settled {
            debug!(target: "navarb.conflict", expected = ctx.expected_margin_left, "layout resync did not settle");
            return None;
        }
        Some(ConflictResolution::ResyncLayout {
            expected: ctx.expected_margin_left,
            observed,
        })
    }

    fn keep_most_recent(&self, registry: &ComponentRegistry, kind: NavigationMode) -> ConflictResolution {
        let registered = registry.by_kind(kind);
        let kept = match registered.last() {
            Some(winner) => Some(winner.id.clone()),
            None => self
                .probe
                .tagged_nodes()
                .into_iter()
                .rev()
                .find(|n| n.kind == kind && n.is_live())
                .map(|n| n.id),
        };

        let mut removed = Vec::new();
        for loser in registered.iter().filter(|r| Some(&r.id) != kept.as_ref()) {
            registry.unregister(&loser.id);
            self.probe.hide(&loser.id);
            push_unique(&mut removed, &loser.id);
        }
        for node in self.probe.tagged_nodes() {
            if node.kind == kind && node.is_live() && Some(&node.id) != kept.as_ref() {
                self.probe.hide(&node.id);
                push_unique(&mut removed, &node.id);
            }
        }
        ConflictResolution::KeptMostRecent { kept, removed }
    }

    fn hide_inactive(&self, registry: &ComponentRegistry, inactive: NavigationMode) -> ConflictResolution {
        let mut hidden = Vec::new();
        for registration in registry.by_kind(inactive) {
            registry.unregister(&registration.id);
            self.probe.hide(&registration.id);
            push_unique(&mut hidden, &registration.id);
        }
        for node in self.probe.tagged_nodes() {
            if node.kind == inactive && node.is_live() {
                self.probe.hide(&node.id);
                push_unique(&mut hidden, &node.id);
            }
        }
        ConflictResolution::HidInactiveKind {
            kind: inactive,
            hidden,
        }
    }

    #[must_use]
    pub fn status(&self) -> DetectorStatus {
        let state = self.lock();
        DetectorStatus {
            detections_run: state.detections_run,
            conflicts_detected: state.conflicts_detected,
            conflicts_resolved: state.conflicts_resolved,
            last_detection_at_ms: state.last_detection_at_ms,
            unresolved: state.unresolved.clone(),
            history: state.history.iter().cloned().collect(),
        }
    }

    pub fn reset(&self) {
        *self.lock() = DetectorState::default();
    }
}
