#![forbid(unsafe_code)]

//! Resize debouncing with a separate throttled visual path.
//!
//! Browsers deliver a flood of `resize` callbacks during a drag-resize.
//! Recomputing the navigation mode on each one would flap the layout around
//! the breakpoint, so [`ResizeDebouncer`] splits the stream in two:
//!
//! - **Authoritative path** (trailing debounce, default 150 ms): every push
//!   re-arms the deadline and replaces the pending sample ("latest wins").
//!   [`poll`](ResizeDebouncer::poll) yields the sample once the deadline passes
//!   without further pushes.
//! - **Visual path** (leading-edge throttle, default 16 ms): [`push`](ResizeDebouncer::push)
//!   returns the sample immediately if the throttle window elapsed. Consumers
//!   may only use it for numeric width/height feedback, never to decide mode.
//!
//! Superseding a pending sample is the cancellation mechanism; there is no
//! explicit cancel token.
//!
//! # Thread Safety
//!
//! Not thread-safe. Drive it from the host's event loop.

use serde::{Deserialize, Serialize};

use crate::viewport::ViewportSample;

/// Timing configuration for [`ResizeDebouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Quiet period before a sample becomes authoritative.
    pub debounce_ms: u64,
    /// Minimum spacing between visual pass-through samples.
    pub throttle_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            throttle_ms: 16,
        }
    }
}

/// Coalesces raw viewport samples.
#[derive(Debug, Clone, Default)]
pub struct ResizeDebouncer {
    config: DebounceConfig,
    pending: Option<ViewportSample>,
    deadline_ms: Option<u64>,
    last_visual_ms: Option<u64>,
    /// Samples absorbed into the current pending one.
    coalesced: u32,
}

impl ResizeDebouncer {
    #[must_use]
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn config(&self) -> DebounceConfig {
        self.config
    }

    /// Push a raw sample, using its timestamp as the current time.
    ///
    /// Returns `Some(sample)` on the visual path when the throttle window has
    /// elapsed, `None` otherwise. The sample is always retained as the pending
    /// authoritative candidate.
    pub fn push(&mut self, sample: ViewportSample) -> Option<ViewportSample> {
        let now = sample.timestamp_ms;
        if self.pending.is_some() {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        self.pending = Some(sample);
        self.deadline_ms = Some(now.saturating_add(self.config.debounce_ms));

        let visual_due = match self.last_visual_ms {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.config.throttle_ms,
        };
        if visual_due {
            self.last_visual_ms = Some(now);
            Some(sample)
        } else {
            None
        }
    }

    /// Yield the pending sample if its debounce deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<ViewportSample> {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => self.take(),
            _ => None,
        }
    }

    /// Yield the pending sample regardless of the deadline.
    pub fn flush(&mut self) -> Option<ViewportSample> {
        self.take()
    }

    /// Whether a sample is waiting for its deadline.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending sample, if any.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Number of samples superseded by the currently pending one.
    #[must_use]
    pub fn coalesced_count(&self) -> u32 {
        self.coalesced
    }

    /// Discard any pending sample.
    pub fn clear(&mut self) {
        self.pending = None;
        self.deadline_ms = None;
        self.coalesced = 0;
    }

    fn take(&mut self) -> Option<ViewportSample> {
        self.deadline_ms = None;
        self.coalesced = 0;
        self.pending.take()
    }
}
