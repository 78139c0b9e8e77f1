#![forbid(unsafe_code)]

//! Monotonic clock abstraction.
//!
//! The engine never reads wall time itself. Hosts pass `now_ms` into every
//! time-sensitive call, usually obtained from a [`NavClock`]. Native and
//! wasm hosts use [`SystemClock`]; tests and replays use
//! [`DeterministicClock`] and advance it explicitly.

use web_time::{Duration, Instant};

/// Monotonic time source in milliseconds since an unspecified epoch.
pub trait NavClock {
    fn now_ms(&self) -> u64;
}

/// Clock backed by `web_time::Instant` (performance.now() on wasm).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl NavClock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Host-controlled clock for deterministic tests and scenario replay.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set_ms(&mut self, now_ms: u64) {
        self.now = Duration::from_millis(now_ms);
    }

    /// Advance monotonic time by `dt_ms`.
    pub fn advance_ms(&mut self, dt_ms: u64) {
        self.now = self.now.saturating_add(Duration::from_millis(dt_ms));
    }
}

impl NavClock for DeterministicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.now.as_millis()).unwrap_or(u64::MAX)
    }
}
