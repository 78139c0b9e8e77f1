#![forbid(unsafe_code)]

//! Fallback navigation and the recovery loop guard.
//!
//! When a concrete navigation component fails, the controller shows a plain
//! list of links ([`FallbackNavigation`]) instead. [`RecoveryGuard`] decides
//! when to try mounting the real component again.
//!
//! # Recovery Policy
//!
//! ```text
//! failure ──► one automatic retry on the next tick
//!                 │
//!                 ├─ succeeds ──► Idle
//!                 └─ fails again within loop window ──► blocked
//!                                                        │
//!                    set_route / reload ◄────────────────┘
//! ```
//!
//! A failure more than `loop_window_ms` after the previous one starts a fresh
//! cycle with its own automatic retry.

use serde::{Deserialize, Serialize};

/// One entry of the fallback link list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackLink {
    pub label: String,
    pub route: String,
}

impl FallbackLink {
    #[must_use]
    pub fn new(label: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            route: route.into(),
        }
    }
}

/// What the page renders while the controller is in fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackNavigation {
    pub reason: String,
    pub links: Vec<FallbackLink>,
    /// Route of the current page, highlighted in the list.
    pub active_route: String,
    pub activated_at_ms: u64,
    /// Automatic retries are exhausted; only a route change or reload helps.
    pub recovery_blocked: bool,
}

impl FallbackNavigation {
    #[must_use]
    pub fn is_active(&self, link: &FallbackLink) -> bool {
        link.route == self.active_route
    }
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryDecision {
    /// An automatic retry will run on the next tick.
    RetryScheduled,
    /// Retry only on an external trigger.
    Manual,
    /// Failures are looping; automatic retries are blocked.
    Blocked,
}

/// Serializable guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStatus {
    pub attempts: u32,
    pub failures: u32,
    pub retry_pending: bool,
    pub blocked: bool,
    pub last_failure_ms: Option<u64>,
}

/// Rate limiter for automatic recovery.
#[derive(Debug, Clone)]
pub struct RecoveryGuard {
    auto_retry: bool,
    loop_window_ms: u64,
    last_failure_ms: Option<u64>,
    retry_pending: bool,
    blocked: bool,
    attempts: u32,
    failures: u32,
}

impl RecoveryGuard {
    #[must_use]
    pub const fn new(auto_retry: bool, loop_window_ms: u64) -> Self {
        Self {
            auto_retry,
            loop_window_ms,
            last_failure_ms: None,
            retry_pending: false,
            blocked: false,
            attempts: 0,
            failures: 0,
        }
    }

    /// Record a component failure at `now_ms`.
    pub fn record_failure(&mut self, now_ms: u64) -> RecoveryDecision {
        self.failures += 1;
        let looping = self
            .last_failure_ms
            .is_some_and(|prev| now_ms.saturating_sub(prev) < self.loop_window_ms);
        self.last_failure_ms = Some(now_ms);

        if looping {
            self.blocked = true;
            self.retry_pending = false;
            return RecoveryDecision::Blocked;
        }
        self.retry_pending = self.auto_retry;
        if self.retry_pending {
            RecoveryDecision::RetryScheduled
        } else {
            RecoveryDecision::Manual
        }
    }

    /// Consume the scheduled automatic retry, if any.
    pub fn take_auto_retry(&mut self) -> bool {
        if self.retry_pending && !self.blocked {
            self.retry_pending = false;
            self.attempts += 1;
            true
        } else {
            false
        }
    }

    /// An external trigger (route change, reload) clears the block and starts
    /// a fresh cycle.
    pub fn external_trigger(&mut self) {
        self.blocked = false;
        self.retry_pending = false;
        self.last_failure_ms = None;
        self.attempts += 1;
    }

    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    #[must_use]
    pub const fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    #[must_use]
    pub const fn status(&self) -> RecoveryStatus {
        RecoveryStatus {
            attempts: self.attempts,
            failures: self.failures,
            retry_pending: self.retry_pending,
            blocked: self.blocked,
            last_failure_ms: self.last_failure_ms,
        }
    }
}
