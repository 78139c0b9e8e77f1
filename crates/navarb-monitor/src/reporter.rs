#![forbid(unsafe_code)]

//! Out-of-band escalation for critical events.

use std::sync::{Arc, Mutex};

use crate::event::MonitorEvent;

/// Receives critical events synchronously at log time.
///
/// Called after the monitor has released its internal lock, so an
/// implementation may log back into the same monitor.
pub trait CriticalReporter: Send + Sync {
    fn report(&self, event: &MonitorEvent);
}

/// Default reporter: emits a `tracing` error with the event fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CriticalReporter for TracingReporter {
    fn report(&self, event: &MonitorEvent) {
        tracing::error!(
            target: "navarb.monitor",
            event_id = event.id,
            kind = %event.kind,
            session_id = %event.session_id,
            payload = %event.payload,
            "critical navigation event"
        );
    }
}

/// Reporter that keeps every critical event in memory.
///
/// Used by hosts that batch crash reports and by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<MonitorEvent> {
        match self.reports.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CriticalReporter for MemoryReporter {
    fn report(&self, event: &MonitorEvent) {
        let mut reports = match self.reports.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        reports.push(event.clone());
    }
}
