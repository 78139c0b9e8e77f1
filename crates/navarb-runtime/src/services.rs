#![forbid(unsafe_code)]

//! Page-wide shared services.
//!
//! One [`NavigationServices`] bundle is built per page and handed to every
//! controller on it, so they all log to the same monitor and arbitrate over
//! the same registry.

use std::sync::Arc;

use navarb_monitor::{MonitorSink, NavigationMonitor};
use navarb_registry::{ComponentRegistry, ConflictDetector, VisibilityProbe};
use tracing::warn;

use crate::config::NavigationConfig;

/// Shared monitor, registry, and conflict detector.
#[derive(Debug, Clone)]
pub struct NavigationServices {
    pub monitor: NavigationMonitor,
    pub registry: ComponentRegistry,
    pub detector: ConflictDetector,
}

impl NavigationServices {
    /// Build fresh services from config over the given probe.
    ///
    /// A sink that cannot be opened is skipped with a warning.
    #[must_use]
    pub fn new(config: &NavigationConfig, probe: Arc<dyn VisibilityProbe + Send + Sync>) -> Self {
        let mut monitor = NavigationMonitor::new(config.monitor.clone());
        match MonitorSink::from_config(&config.monitor_sink) {
            Ok(Some(sink)) => monitor = monitor.with_sink(sink),
            Ok(None) => {}
            Err(err) => {
                warn!(target: "navarb.monitor", error = %err, "monitor sink unavailable; continuing without it");
            }
        }
        let detector = ConflictDetector::new(monitor.clone(), probe);
        Self {
            monitor,
            registry: ComponentRegistry::new(),
            detector,
        }
    }

    #[must_use]
    pub fn from_parts(
        monitor: NavigationMonitor,
        registry: ComponentRegistry,
        detector: ConflictDetector,
    ) -> Self {
        Self {
            monitor,
            registry,
            detector,
        }
    }

    /// Clear all shared state. Used between tests and on full page reloads.
    pub fn reset(&self) {
        self.monitor.reset();
        self.registry.reset();
        self.detector.reset();
    }
}
