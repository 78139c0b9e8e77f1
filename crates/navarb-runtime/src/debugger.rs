#![forbid(unsafe_code)]

//! Read-only diagnostics snapshot.
//!
//! [`NavigationDebugger`] gathers detector status, the monitor export, the
//! registry contents, and (when given a controller) the breakpoint and
//! controller state into one serializable [`DebugSnapshot`]. Each source is
//! captured independently; a source that panics is reported in
//! [`DebugSnapshot::errors`] and left as `None`.

use std::panic::{AssertUnwindSafe, catch_unwind};

use navarb_core::BreakpointSnapshot;
use navarb_monitor::{MonitorExport, NavigationMonitor};
use navarb_registry::{ComponentRegistry, ConflictDetector, DetectorStatus, Registration};
use serde::{Deserialize, Serialize};

use crate::controller::{ControllerSnapshot, NavigationController};
use crate::services::NavigationServices;

/// Everything known about navigation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub captured_at_ms: u64,
    pub controller: Option<ControllerSnapshot>,
    pub breakpoint: Option<BreakpointSnapshot>,
    pub registrations: Option<Vec<Registration>>,
    pub detector: Option<DetectorStatus>,
    pub monitor: Option<MonitorExport>,
    /// One entry per source that failed to capture.
    pub errors: Vec<String>,
}

impl DebugSnapshot {
    /// Pretty JSON, or an error object if serialization fails.
    #[must_use]
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|err| format!("{{\"error\":\"snapshot serialization failed: {err}\"}}"))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

fn capture<T>(source: &str, errors: &mut Vec<String>, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = format!("{source}: {}", panic_message(payload.as_ref()));
            tracing::warn!(target: "navarb.controller", error = %message, "debug source failed");
            errors.push(message);
            None
        }
    }
}

/// Aggregates the shared services for inspection.
#[derive(Debug, Clone)]
pub struct NavigationDebugger {
    monitor: NavigationMonitor,
    registry: ComponentRegistry,
    detector: ConflictDetector,
}

impl NavigationDebugger {
    #[must_use]
    pub fn new(services: &NavigationServices) -> Self {
        Self {
            monitor: services.monitor.clone(),
            registry: services.registry.clone(),
            detector: services.detector.clone(),
        }
    }

    /// Capture a snapshot of the shared services and, optionally, one
    /// controller.
    #[must_use]
    pub fn snapshot(&self, controller: Option<&NavigationController>, now_ms: u64) -> DebugSnapshot {
        let mut errors = Vec::new();
        let (controller_snapshot, breakpoint) = match controller {
            Some(c) => (
                capture("controller", &mut errors, || c.snapshot()),
                capture("breakpoint", &mut errors, || c.breakpoint().snapshot()),
            ),
            None => (None, None),
        };
        let registrations = capture("registry", &mut errors, || self.registry.registrations());
        let detector = capture("detector", &mut errors, || self.detector.status());
        let monitor = capture("monitor", &mut errors, || self.monitor.export_data());

        DebugSnapshot {
            captured_at_ms: now_ms,
            controller: controller_snapshot,
            breakpoint,
            registrations,
            detector,
            monitor,
            errors,
        }
    }
}
