#![forbid(unsafe_code)]

//! Monitor event records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event severity. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorEventKind {
    NavigationSwitch,
    ConflictDetected,
    ConflictResolved,
    NavigationError,
    NavigationLoad,
    UserAction,
    BreakpointDrift,
    FallbackActivated,
    RecoveryAttempt,
    RecoverySucceeded,
    RecoveryBlocked,
    MonitorEnabled,
    MonitorDisabled,
}

impl MonitorEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NavigationSwitch => "navigation_switch",
            Self::ConflictDetected => "conflict_detected",
            Self::ConflictResolved => "conflict_resolved",
            Self::NavigationError => "navigation_error",
            Self::NavigationLoad => "navigation_load",
            Self::UserAction => "user_action",
            Self::BreakpointDrift => "breakpoint_drift",
            Self::FallbackActivated => "fallback_activated",
            Self::RecoveryAttempt => "recovery_attempt",
            Self::RecoverySucceeded => "recovery_succeeded",
            Self::RecoveryBlocked => "recovery_blocked",
            Self::MonitorEnabled => "monitor_enabled",
            Self::MonitorDisabled => "monitor_disabled",
        }
    }
}

impl fmt::Display for MonitorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the monitor log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    /// Monotonic per-session id, starting at 1.
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MonitorEventKind,
    pub severity: Severity,
    pub payload: serde_json::Value,
    pub timestamp_ms: u64,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn event_serializes_with_type_field() {
        let event = MonitorEvent {
            id: 7,
            kind: MonitorEventKind::ConflictResolved,
            severity: Severity::Info,
            payload: serde_json::json!({"kept": "sidebar-2"}),
            timestamp_ms: 42,
            session_id: "s".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conflict_resolved");
        assert_eq!(json["severity"], "info");
        assert_eq!(json["payload"]["kept"], "sidebar-2");
    }

    #[test]
    fn kind_strings_match_serde() {
        for kind in [
            MonitorEventKind::NavigationSwitch,
            MonitorEventKind::BreakpointDrift,
            MonitorEventKind::MonitorDisabled,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }
}
