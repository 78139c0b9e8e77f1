#![forbid(unsafe_code)]

//! navarb public facade crate.
//!
//! Re-exports the common types from the internal crates, offers a prelude,
//! and wires a fully headless page ([`HeadlessPage`]) for tests, replay
//! tooling, and server-side rendering.

use std::sync::Arc;

// --- Core re-exports -------------------------------------------------------

pub use navarb_core::{
    BreakpointPolicy, BreakpointSnapshot, BreakpointState, DeterministicClock, LayoutMetrics,
    LayoutVars, NavClock, NavigationMode, SystemClock, ViewportSample,
};

// --- Monitor re-exports ----------------------------------------------------

pub use navarb_monitor::{
    MonitorConfig, MonitorEvent, MonitorEventKind, MonitorExport, MonitorSinkConfig,
    NavigationMonitor, Severity,
};

// --- Registry re-exports ---------------------------------------------------

pub use navarb_registry::{
    ComponentRegistry, ConflictDetector, ConflictKind, ConflictRecord, HeadlessDom, VisibilityProbe,
};

// --- Runtime re-exports ----------------------------------------------------

pub use navarb_runtime::{
    ComponentEvent, ControllerEvent, ControllerState, DebugSnapshot, FallbackNavigation,
    HeadlessSurface, HeadlessViewport, NavError, NavigationConfig, NavigationController,
    NavigationDebugger, NavigationServices, NavigationSurface, Subscription, ViewportHost,
};

/// Standard result type for navarb APIs.
pub type Result<T> = navarb_runtime::error::Result<T>;

// --- Headless page ---------------------------------------------------------

/// One page with a single controller, backed entirely by in-memory hosts.
///
/// Every driving call reads the time from the page's [`NavClock`].
/// [`HeadlessPage::mount`] runs on wall time; [`HeadlessPage::replay`] uses a
/// [`DeterministicClock`] that the caller moves with
/// [`HeadlessPage::advance_to`].
pub struct HeadlessPage<C: NavClock = SystemClock> {
    pub clock: C,
    pub dom: HeadlessDom,
    pub viewport: HeadlessViewport,
    pub surface: HeadlessSurface,
    pub services: NavigationServices,
    pub controller: NavigationController,
}

impl HeadlessPage<SystemClock> {
    /// Build the page on the system clock and mount at `width` x `height`.
    #[must_use]
    pub fn mount(config: NavigationConfig, route: &str, width: u32, height: u32) -> Self {
        Self::with_clock(SystemClock::new(), config, route, width, height)
    }
}

impl HeadlessPage<DeterministicClock> {
    /// Build the page on a deterministic clock starting at `0`.
    #[must_use]
    pub fn replay(config: NavigationConfig, route: &str, width: u32, height: u32) -> Self {
        Self::with_clock(DeterministicClock::new(), config, route, width, height)
    }

    /// Move the clock to `now_ms`. Nothing runs until the next driving call.
    pub fn advance_to(&mut self, now_ms: u64) {
        self.clock.set_ms(now_ms);
    }
}

impl<C: NavClock> HeadlessPage<C> {
    #[must_use]
    pub fn with_clock(clock: C, config: NavigationConfig, route: &str, width: u32, height: u32) -> Self {
        let dom = HeadlessDom::new();
        let viewport = HeadlessViewport::new(dom.clone());
        let surface = HeadlessSurface::new(dom.clone());
        let services = NavigationServices::new(&config, Arc::new(dom.clone()));
        let controller = NavigationController::builder(config, services.clone())
            .route(route)
            .mount(
                Box::new(viewport.clone()),
                Box::new(surface.clone()),
                ViewportSample::new(width, height, clock.now_ms()),
            );
        Self {
            clock,
            dom,
            viewport,
            surface,
            services,
            controller,
        }
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let now_ms = self.now_ms();
        self.controller.on_resize(width, height, now_ms);
    }

    pub fn rotate(&mut self, width: u32, height: u32) {
        let now_ms = self.now_ms();
        self.controller.on_orientation_change(width, height, now_ms);
    }

    pub fn tick(&mut self) {
        let now_ms = self.now_ms();
        self.controller.tick(now_ms);
    }

    #[must_use]
    pub fn debugger(&self) -> NavigationDebugger {
        NavigationDebugger::new(&self.services)
    }

    /// Debug snapshot of the page and its controller.
    #[must_use]
    pub fn snapshot(&self) -> DebugSnapshot {
        self.debugger().snapshot(Some(&self.controller), self.now_ms())
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ControllerEvent, ControllerState, HeadlessPage, NavigationConfig, NavigationController,
        NavigationDebugger, NavigationMode, NavigationMonitor, NavigationServices, Result,
        ViewportSample,
    };

    pub use crate::{core, monitor, registry, runtime};
}

pub use navarb_core as core;
pub use navarb_monitor as monitor;
pub use navarb_registry as registry;
pub use navarb_runtime as runtime;
