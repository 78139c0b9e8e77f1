#![forbid(unsafe_code)]

//! Core primitives for navigation arbitration.
//!
//! This crate answers one question: *which viewport regime are we in right
//! now?* It owns no UI and performs no I/O. Hosts push viewport samples and
//! advance time explicitly; everything here is a pure state holder.
//!
//! # Key Components
//!
//! - [`NavigationMode`] and [`BreakpointPolicy`] - the single-threshold mode function
//! - [`ViewportSample`] - immutable snapshot of a resize/orientation callback
//! - [`ResizeDebouncer`] - trailing debounce (authoritative) + throttle (visual)
//! - [`BreakpointState`] - mode bookkeeping and the transition guard
//! - [`LayoutMetrics`] / [`LayoutVars`] - content-area custom properties per mode
//! - [`NavClock`] - monotonic time abstraction with system and deterministic clocks

pub mod breakpoint;
pub mod clock;
pub mod debounce;
pub mod layout;
pub mod mode;
pub mod viewport;

pub use breakpoint::{
    BreakpointDrift, BreakpointSnapshot, BreakpointState, ModeChange, PreservedUiState,
    TransitionRequest,
};
pub use clock::{DeterministicClock, NavClock, SystemClock};
pub use debounce::{DebounceConfig, ResizeDebouncer};
pub use layout::{LayoutMetrics, LayoutVars};
pub use mode::{BreakpointPolicy, DEFAULT_BREAKPOINT_PX, NavigationMode};
pub use viewport::{Orientation, ViewportSample};
