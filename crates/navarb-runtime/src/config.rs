#![forbid(unsafe_code)]

//! Navigation configuration as data.
//!
//! Every tunable of the engine lives in one [`NavigationConfig`] that can be
//! loaded from TOML or JSON at startup. Every field has a default, so an
//! empty document yields the stock behavior.
//!
//! ```toml
//! [breakpoint]
//! threshold_px = 1024
//!
//! [timing]
//! debounce_ms = 150
//! settle_ms = 50
//!
//! [monitor]
//! max_events = 1000
//! ```

use std::path::Path;

use navarb_core::{BreakpointPolicy, DebounceConfig, LayoutMetrics};
use navarb_monitor::{MonitorConfig, MonitorSinkConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fallback::FallbackLink;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub breakpoint: BreakpointSection,
    pub timing: TimingSection,
    pub conflict: ConflictSection,
    pub layout: LayoutMetrics,
    pub monitor: MonitorConfig,
    pub monitor_sink: MonitorSinkConfig,
    pub recovery: RecoverySection,
    pub fallback: FallbackSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakpointSection {
    pub threshold_px: u32,
    /// Widths this close to the threshold are flagged in diagnostics.
    pub boundary_tolerance_px: u32,
    pub drift_tolerance_px: u32,
}

impl Default for BreakpointSection {
    fn default() -> Self {
        let policy = BreakpointPolicy::default();
        Self {
            threshold_px: policy.threshold,
            boundary_tolerance_px: policy.boundary_tolerance,
            drift_tolerance_px: navarb_core::breakpoint::DEFAULT_DRIFT_TOLERANCE_PX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub debounce_ms: u64,
    pub throttle_ms: u64,
    /// Delay between starting a transition and restoring UI state.
    pub settle_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        let debounce = DebounceConfig::default();
        Self {
            debounce_ms: debounce.debounce_ms,
            throttle_ms: debounce.throttle_ms,
            settle_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictSection {
    pub margin_tolerance_px: f64,
    /// Run detection after every settled transition.
    pub detect_after_settle: bool,
}

impl Default for ConflictSection {
    fn default() -> Self {
        Self {
            margin_tolerance_px: navarb_registry::DEFAULT_MARGIN_TOLERANCE_PX,
            detect_after_settle: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySection {
    /// Retry once automatically on the tick after entering fallback.
    pub auto_retry: bool,
    /// A second failure within this window blocks automatic retries.
    pub loop_window_ms: u64,
}

impl Default for RecoverySection {
    fn default() -> Self {
        Self {
            auto_retry: true,
            loop_window_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    pub initial_route: String,
    pub links: Vec<FallbackLink>,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            initial_route: "/dashboard".into(),
            links: [
                ("Dashboard", "/dashboard"),
                ("Attendance", "/attendance"),
                ("Leave", "/leave"),
                ("Feedback", "/feedback"),
                ("Projects", "/projects"),
            ]
            .into_iter()
            .map(|(label, route)| FallbackLink::new(label, route))
            .collect(),
        }
    }
}

impl NavigationConfig {
    /// Load from a TOML string and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Check invariants. Returns a list of human-readable problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.breakpoint.threshold_px == 0 {
            errors.push("breakpoint.threshold_px must be > 0".into());
        }
        if self.breakpoint.boundary_tolerance_px >= self.breakpoint.threshold_px {
            errors.push(format!(
                "breakpoint.boundary_tolerance_px must be < threshold_px, got {}",
                self.breakpoint.boundary_tolerance_px
            ));
        }
        if self.timing.debounce_ms == 0 {
            errors.push("timing.debounce_ms must be > 0".into());
        }
        if self.timing.throttle_ms > self.timing.debounce_ms {
            errors.push(format!(
                "timing.throttle_ms ({}) must not exceed timing.debounce_ms ({})",
                self.timing.throttle_ms, self.timing.debounce_ms
            ));
        }
        if self.conflict.margin_tolerance_px.is_nan() || self.conflict.margin_tolerance_px < 0.0 {
            errors.push(format!(
                "conflict.margin_tolerance_px must be >= 0, got {}",
                self.conflict.margin_tolerance_px
            ));
        }
        for (name, value) in [
            ("layout.sidebar_width", self.layout.sidebar_width),
            ("layout.sidebar_collapsed_width", self.layout.sidebar_collapsed_width),
            ("layout.mobile_header_height", self.layout.mobile_header_height),
            ("layout.mobile_bottom_nav_height", self.layout.mobile_bottom_nav_height),
        ] {
            if value.is_nan() || value < 0.0 {
                errors.push(format!("{name} must be >= 0, got {value}"));
            }
        }
        if self.layout.sidebar_collapsed_width > self.layout.sidebar_width {
            errors.push("layout.sidebar_collapsed_width must not exceed sidebar_width".into());
        }
        if self.monitor.max_events == 0 {
            errors.push("monitor.max_events must be > 0".into());
        }
        if self.fallback.links.is_empty() {
            errors.push("fallback.links must not be empty".into());
        }
        if !self.fallback.initial_route.starts_with('/') {
            errors.push(format!(
                "fallback.initial_route must start with '/', got {:?}",
                self.fallback.initial_route
            ));
        }

        errors
    }

    #[must_use]
    pub fn breakpoint_policy(&self) -> BreakpointPolicy {
        BreakpointPolicy {
            threshold: self.breakpoint.threshold_px,
            boundary_tolerance: self.breakpoint.boundary_tolerance_px,
        }
    }

    #[must_use]
    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig {
            debounce_ms: self.timing.debounce_ms,
            throttle_ms: self.timing.throttle_ms,
        }
    }
}
