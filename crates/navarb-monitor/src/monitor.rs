#![forbid(unsafe_code)]

//! The bounded navigation event log.
//!
//! # Invariants
//!
//! 1. Events are appended in call order and never reordered.
//! 2. `events().len() <= max_events`; the oldest event is evicted first.
//! 3. Event ids increase by exactly 1 per appended event within a session.
//! 4. While disabled, nothing is appended except the `monitor_disabled` marker
//!    written as the last event before muting.
//! 5. External callbacks (critical reporter) run after the lock is released.
//!
//! # Failure Modes
//!
//! - **Poisoned lock**: recovered with `into_inner`; history is preserved.
//! - **Sink write error**: logged at `warn` and otherwise ignored. The
//!   in-memory log is authoritative.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use navarb_core::NavigationMode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::event::{MonitorEvent, MonitorEventKind, Severity};
use crate::reporter::{CriticalReporter, TracingReporter};
use crate::sink::MonitorSink;

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum retained events.
    pub max_events: usize,
    /// Whether logging starts enabled.
    pub enabled: bool,
    /// Navigation loads slower than this are logged as warnings.
    pub slow_load_ms: u64,
    /// Fixed session id. A random v4 UUID is used when absent.
    pub session_id: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            enabled: true,
            slow_load_ms: 1000,
            session_id: None,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Aggregate counters over the whole session, including evicted events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorMetrics {
    pub total_events: u64,
    pub evicted_events: u64,
    pub info_events: u64,
    pub warning_events: u64,
    pub critical_events: u64,
    pub navigation_switches: u64,
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
    pub navigation_errors: u64,
    pub navigation_loads: u64,
    pub average_load_ms: f64,
    pub user_actions: u64,
    pub first_event_at_ms: Option<u64>,
    pub last_event_at_ms: Option<u64>,
}

impl MonitorMetrics {
    fn record(&mut self, event: &MonitorEvent) {
        self.total_events += 1;
        match event.severity {
            Severity::Info => self.info_events += 1,
            Severity::Warning => self.warning_events += 1,
            Severity::Critical => self.critical_events += 1,
        }
        match event.kind {
            MonitorEventKind::NavigationSwitch => self.navigation_switches += 1,
            MonitorEventKind::ConflictDetected => self.conflicts_detected += 1,
            MonitorEventKind::ConflictResolved => self.conflicts_resolved += 1,
            MonitorEventKind::NavigationError => self.navigation_errors += 1,
            MonitorEventKind::UserAction => self.user_actions += 1,
            MonitorEventKind::NavigationLoad => {
                let duration = event
                    .payload
                    .get("duration_ms")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(0.0);
                let n = self.navigation_loads as f64;
                self.average_load_ms = (self.average_load_ms * n + duration) / (n + 1.0);
                self.navigation_loads += 1;
            }
            _ => {}
        }
        self.first_event_at_ms.get_or_insert(event.timestamp_ms);
        self.last_event_at_ms = Some(event.timestamp_ms);
    }
}

/// Serializable snapshot of the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorExport {
    pub session_id: String,
    pub enabled: bool,
    pub metrics: MonitorMetrics,
    pub events: Vec<MonitorEvent>,
}

struct MonitorInner {
    config: MonitorConfig,
    session_id: String,
    enabled: bool,
    next_id: u64,
    events: VecDeque<MonitorEvent>,
    metrics: MonitorMetrics,
    reporter: Arc<dyn CriticalReporter>,
    sink: Option<MonitorSink>,
}

impl MonitorInner {
    fn append(
        &mut self,
        kind: MonitorEventKind,
        payload: serde_json::Value,
        severity: Severity,
        now_ms: u64,
    ) -> MonitorEvent {
        self.next_id += 1;
        let event = MonitorEvent {
            id: self.next_id,
            kind,
            severity,
            payload,
            timestamp_ms: now_ms,
            session_id: self.session_id.clone(),
        };
        while self.events.len() >= self.config.max_events.max(1) {
            self.events.pop_front();
            self.metrics.evicted_events += 1;
        }
        self.events.push_back(event.clone());
        self.metrics.record(&event);

        if let Some(sink) = &self.sink
            && let Err(err) = sink.write_event(&event)
        {
            warn!(target: "navarb.monitor", error = %err, "monitor sink write failed");
        }
        event
    }
}

/// Shared handle to the navigation event log.
#[derive(Clone)]
pub struct NavigationMonitor {
    inner: Arc<Mutex<MonitorInner>>,
}

impl std::fmt::Debug for NavigationMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("NavigationMonitor")
            .field("session_id", &inner.session_id)
            .field("enabled", &inner.enabled)
            .field("events", &inner.events.len())
            .finish()
    }
}

impl Default for NavigationMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl NavigationMonitor {
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            inner: Arc::new(Mutex::new(MonitorInner {
                enabled: config.enabled,
                config,
                session_id,
                next_id: 0,
                events: VecDeque::new(),
                metrics: MonitorMetrics::default(),
                reporter: Arc::new(TracingReporter),
                sink: None,
            })),
        }
    }

    /// Replace the critical reporter.
    #[must_use]
    pub fn with_reporter(self, reporter: Arc<dyn CriticalReporter>) -> Self {
        self.lock().reporter = reporter;
        self
    }

    /// Mirror events to a JSONL sink.
    #[must_use]
    pub fn with_sink(self, sink: MonitorSink) -> Self {
        self.lock().sink = Some(sink);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MonitorInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> String {
        self.lock().session_id.clone()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    #[must_use]
    pub fn max_events(&self) -> usize {
        self.lock().config.max_events
    }

    /// Append an event. Returns its id, or `None` while disabled.
    pub fn log_event(
        &self,
        kind: MonitorEventKind,
        payload: serde_json::Value,
        severity: Severity,
        now_ms: u64,
    ) -> Option<u64> {
        let (event, reporter) = {
            let mut inner = self.lock();
            if !inner.enabled {
                return None;
            }
            let event = inner.append(kind, payload, severity, now_ms);
            let reporter = (severity == Severity::Critical).then(|| Arc::clone(&inner.reporter));
            (event, reporter)
        };

        match event.severity {
            Severity::Info => debug!(
                target: "navarb.monitor",
                event_id = event.id,
                kind = %event.kind,
                "navigation event"
            ),
            Severity::Warning => warn!(
                target: "navarb.monitor",
                event_id = event.id,
                kind = %event.kind,
                payload = %event.payload,
                "navigation warning"
            ),
            Severity::Critical => {}
        }

        if let Some(reporter) = reporter {
            reporter.report(&event);
        }
        Some(event.id)
    }

    pub fn log_navigation_switch(
        &self,
        from: NavigationMode,
        to: NavigationMode,
        width: u32,
        reason: &str,
        now_ms: u64,
    ) -> Option<u64> {
        self.log_event(
            MonitorEventKind::NavigationSwitch,
            json!({ "from": from, "to": to, "width": width, "reason": reason }),
            Severity::Info,
            now_ms,
        )
    }

    /// Record a detected conflict. `payload` describes it.
    pub fn log_conflict(&self, payload: serde_json::Value, now_ms: u64) -> Option<u64> {
        self.log_event(MonitorEventKind::ConflictDetected, payload, Severity::Warning, now_ms)
    }

    /// Record a resolution action.
    pub fn log_conflict_resolved(&self, payload: serde_json::Value, now_ms: u64) -> Option<u64> {
        self.log_event(MonitorEventKind::ConflictResolved, payload, Severity::Info, now_ms)
    }

    /// Record a component failure. Critical failures escalate immediately.
    pub fn log_navigation_error(
        &self,
        component: &str,
        message: &str,
        critical: bool,
        now_ms: u64,
    ) -> Option<u64> {
        let severity = if critical {
            Severity::Critical
        } else {
            Severity::Warning
        };
        self.log_event(
            MonitorEventKind::NavigationError,
            json!({ "component": component, "message": message }),
            severity,
            now_ms,
        )
    }

    pub fn log_navigation_load(
        &self,
        mode: NavigationMode,
        duration_ms: u64,
        now_ms: u64,
    ) -> Option<u64> {
        let slow = duration_ms > self.lock().config.slow_load_ms;
        self.log_event(
            MonitorEventKind::NavigationLoad,
            json!({ "navigation_type": mode, "duration_ms": duration_ms, "slow": slow }),
            if slow { Severity::Warning } else { Severity::Info },
            now_ms,
        )
    }

    pub fn log_user_action(
        &self,
        action: &str,
        detail: serde_json::Value,
        now_ms: u64,
    ) -> Option<u64> {
        self.log_event(
            MonitorEventKind::UserAction,
            json!({ "action": action, "detail": detail }),
            Severity::Info,
            now_ms,
        )
    }

    pub fn log_drift(
        &self,
        authoritative_width: u32,
        live_width: u32,
        now_ms: u64,
    ) -> Option<u64> {
        self.log_event(
            MonitorEventKind::BreakpointDrift,
            json!({
                "authoritative_width": authoritative_width,
                "live_width": live_width,
                "delta": authoritative_width.abs_diff(live_width),
            }),
            Severity::Warning,
            now_ms,
        )
    }

    /// Record a fallback/recovery lifecycle step.
    pub fn log_recovery(
        &self,
        kind: MonitorEventKind,
        payload: serde_json::Value,
        now_ms: u64,
    ) -> Option<u64> {
        let severity = match kind {
            MonitorEventKind::FallbackActivated | MonitorEventKind::RecoveryBlocked => {
                Severity::Warning
            }
            _ => Severity::Info,
        };
        self.log_event(kind, payload, severity, now_ms)
    }

    /// Enable or disable logging without clearing history.
    ///
    /// Disabling writes a `monitor_disabled` marker as the last event;
    /// enabling writes a `monitor_enabled` marker as the first new one.
    pub fn set_enabled(&self, enabled: bool, now_ms: u64) {
        let mut inner = self.lock();
        if inner.enabled == enabled {
            return;
        }
        let kind = if enabled {
            MonitorEventKind::MonitorEnabled
        } else {
            MonitorEventKind::MonitorDisabled
        };
        inner.append(kind, json!({ "enabled": enabled }), Severity::Info, now_ms);
        inner.enabled = enabled;
        info!(target: "navarb.monitor", enabled, "monitor toggled");
    }

    /// Retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.lock().events.iter().cloned().collect()
    }

    #[must_use]
    pub fn events_of(&self, kind: MonitorEventKind) -> Vec<MonitorEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn metrics(&self) -> MonitorMetrics {
        self.lock().metrics.clone()
    }

    /// Snapshot safe to serialize.
    #[must_use]
    pub fn export_data(&self) -> MonitorExport {
        let inner = self.lock();
        MonitorExport {
            session_id: inner.session_id.clone(),
            enabled: inner.enabled,
            metrics: inner.metrics.clone(),
            events: inner.events.iter().cloned().collect(),
        }
    }

    /// Clear history and counters and re-enable. The session id is kept.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.events.clear();
        inner.metrics = MonitorMetrics::default();
        inner.next_id = 0;
        inner.enabled = inner.config.enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use pretty_assertions::assert_eq;

    fn monitor(cap: usize) -> NavigationMonitor {
        NavigationMonitor::new(
            MonitorConfig::default()
                .with_max_events(cap)
                .with_session_id("test-session"),
        )
    }

    #[test]
    fn fifo_eviction_at_cap() {
        let m = monitor(3);
        for i in 0..5 {
            m.log_user_action("click", json!(i), i);
        }
        let ids: Vec<u64> = m.events().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        let metrics = m.metrics();
        assert_eq!(metrics.total_events, 5);
        assert_eq!(metrics.evicted_events, 2);
        assert_eq!(metrics.user_actions, 5);
    }

    #[test]
    fn critical_escalates_synchronously() {
        let reporter = MemoryReporter::new();
        let m = monitor(10).with_reporter(Arc::new(reporter.clone()));
        m.log_navigation_error("sidebar", "render threw", false, 1);
        assert!(reporter.is_empty());
        m.log_navigation_error("sidebar", "load failed", true, 2);
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Critical);
        assert_eq!(reports[0].payload["message"], "load failed");
    }

    #[test]
    fn reporter_may_log_back_into_monitor() {
        struct Echo(NavigationMonitor);
        impl CriticalReporter for Echo {
            fn report(&self, event: &MonitorEvent) {
                self.0.log_user_action("escalated", json!(event.id), event.timestamp_ms);
            }
        }
        let m = monitor(10);
        let m = m.clone().with_reporter(Arc::new(Echo(m)));
        m.log_navigation_error("mobile", "boom", true, 5);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn disable_logs_marker_then_mutes() {
        let m = monitor(10);
        m.log_user_action("a", json!(null), 1);
        m.set_enabled(false, 2);
        assert_eq!(m.log_user_action("b", json!(null), 3), None);
        let events = m.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, MonitorEventKind::MonitorDisabled);

        m.set_enabled(true, 4);
        m.log_user_action("c", json!(null), 5);
        let kinds: Vec<_> = m.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MonitorEventKind::UserAction,
                MonitorEventKind::MonitorDisabled,
                MonitorEventKind::MonitorEnabled,
                MonitorEventKind::UserAction,
            ]
        );
    }

    #[test]
    fn set_enabled_same_value_is_silent() {
        let m = monitor(10);
        m.set_enabled(true, 1);
        assert!(m.is_empty());
    }

    #[test]
    fn load_metrics_average_and_slow_flag() {
        let m = monitor(10);
        m.log_navigation_load(NavigationMode::Desktop, 100, 1);
        m.log_navigation_load(NavigationMode::Mobile, 1500, 2);
        let metrics = m.metrics();
        assert_eq!(metrics.navigation_loads, 2);
        assert_eq!(metrics.average_load_ms, 800.0);
        assert_eq!(metrics.warning_events, 1);
    }

    #[test]
    fn export_and_reset() {
        let m = monitor(10);
        m.log_navigation_switch(NavigationMode::Desktop, NavigationMode::Mobile, 768, "resize", 7);
        let export = m.export_data();
        assert_eq!(export.session_id, "test-session");
        assert_eq!(export.events.len(), 1);
        assert_eq!(export.events[0].payload["to"], "mobile");
        assert_eq!(export.metrics.first_event_at_ms, Some(7));
        let text = serde_json::to_string(&export).unwrap();
        assert!(text.contains("navigation_switch"));

        m.reset();
        assert!(m.is_empty());
        assert_eq!(m.metrics(), MonitorMetrics::default());
        assert_eq!(m.log_user_action("x", json!(null), 8), Some(1));
    }

    #[test]
    fn random_session_id_when_unset() {
        let a = NavigationMonitor::default();
        let b = NavigationMonitor::default();
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(a.max_events(), 1000);
    }
}
