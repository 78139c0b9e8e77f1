#![forbid(unsafe_code)]

//! Navigation runtime: the controller that owns the transition lifecycle.
//!
//! # Key Components
//!
//! - [`NavigationController`] - `Idle` / `Transitioning` / `Fallback` state machine
//! - [`NavigationServices`] - shared monitor, registry, and conflict detector
//! - [`ViewportHost`] / [`NavigationSurface`] - the host boundary
//! - [`RecoveryGuard`] - one automatic retry, then loop protection
//! - [`NavigationConfig`] - every tunable, loadable from TOML or JSON
//! - [`NavigationDebugger`] - serializable diagnostics snapshot
//!
//! # Execution Model
//!
//! Single-threaded and host-driven. The host forwards viewport callbacks and
//! calls [`NavigationController::tick`] on its event loop; every call takes
//! the current time explicitly so replays are deterministic.

pub mod config;
pub mod controller;
pub mod debugger;
pub mod error;
pub mod fallback;
pub mod host;
pub mod listeners;
pub mod services;

pub use config::{
    BreakpointSection, ConflictSection, FallbackSection, NavigationConfig, RecoverySection,
    TimingSection,
};
pub use controller::{
    ComponentEvent, ControllerBuilder, ControllerSnapshot, ControllerState, MountedComponent,
    NavigationController,
};
pub use debugger::{DebugSnapshot, NavigationDebugger};
pub use error::{ComponentError, ConfigError, HostError, NavError};
pub use fallback::{
    FallbackLink, FallbackNavigation, RecoveryDecision, RecoveryGuard, RecoveryStatus,
};
pub use host::{HeadlessSurface, HeadlessViewport, NavigationSurface, ViewportHost};
pub use listeners::{ControllerEvent, EventBus, Subscription};
pub use services::NavigationServices;
