//! End-to-end controller scenarios against the headless host.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use navarb_core::{NavigationMode, ViewportSample};
use navarb_monitor::{MemoryReporter, MonitorEventKind, NavigationMonitor, Severity};
use navarb_registry::{ComponentRegistry, ConflictDetector, HeadlessDom, VisibilityProbe};
use navarb_runtime::{
    ControllerEvent, ControllerState, HeadlessSurface, HeadlessViewport, NavigationConfig,
    NavigationController, NavigationServices, ViewportHost,
};
use pretty_assertions::assert_eq;

struct Page {
    dom: HeadlessDom,
    viewport: HeadlessViewport,
    surface: HeadlessSurface,
    reporter: MemoryReporter,
    controller: NavigationController,
    events: Rc<RefCell<Vec<ControllerEvent>>>,
    _subscription: navarb_runtime::Subscription,
}

fn page(width: u32) -> Page {
    let config = NavigationConfig::default();
    let dom = HeadlessDom::new();
    let viewport = HeadlessViewport::new(dom.clone());
    let surface = HeadlessSurface::new(dom.clone());
    let reporter = MemoryReporter::new();
    let monitor = NavigationMonitor::new(config.monitor.clone()).with_reporter(Arc::new(reporter.clone()));
    let detector = ConflictDetector::new(monitor.clone(), Arc::new(dom.clone()));
    let services = NavigationServices::from_parts(monitor, ComponentRegistry::new(), detector);
    let controller = NavigationController::builder(config, services)
        .route("/attendance")
        .mount(
            Box::new(viewport.clone()),
            Box::new(surface.clone()),
            ViewportSample::new(width, 900, 0),
        );
    let events = Rc::new(RefCell::new(Vec::new()));
    let subscription = {
        let events = Rc::clone(&events);
        controller.subscribe(move |e| events.borrow_mut().push(e.clone()))
    };
    Page {
        dom,
        viewport,
        surface,
        reporter,
        controller,
        events,
        _subscription: subscription,
    }
}

fn type_changes(events: &[ControllerEvent]) -> Vec<(NavigationMode, NavigationMode)> {
    events
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::NavigationTypeChange { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn desktop_to_mobile_after_debounce_and_settle() {
    let mut p = page(1200);
    let services = p.controller.services().clone();
    let sidebar_id = p.controller.mounted().unwrap().id.clone();
    assert_eq!(services.registry.by_kind(NavigationMode::Desktop).len(), 1);

    // Drag-resize burst ending at 768.
    for (i, width) in [1150, 1000, 900, 800, 768].into_iter().enumerate() {
        p.controller.on_resize(width, 900, i as u64 * 20);
        p.controller.tick(i as u64 * 20);
    }
    assert_eq!(p.controller.mode(), NavigationMode::Desktop);

    p.controller.tick(80 + 150);
    p.controller.tick(80 + 150 + 50);

    assert_eq!(p.controller.mode(), NavigationMode::Mobile);
    assert_eq!(
        p.controller.state(),
        &ControllerState::Idle {
            mode: NavigationMode::Mobile
        }
    );
    assert!(!services.registry.contains(&sidebar_id));
    assert_eq!(services.registry.by_kind(NavigationMode::Mobile).len(), 1);
    assert!(services.registry.by_kind(NavigationMode::Desktop).is_empty());
    assert_eq!(
        type_changes(&p.events.borrow()),
        vec![(NavigationMode::Desktop, NavigationMode::Mobile)]
    );
    assert!(services.detector.status().unresolved.is_empty());
    assert_eq!(services.monitor.events_of(MonitorEventKind::NavigationSwitch).len(), 1);
    assert_eq!(p.dom.css_var("--mobile-header-height").as_deref(), Some("56px"));
}

#[test]
fn scroll_position_survives_round_trip() {
    let mut p = page(1280);
    p.viewport.scroll_to(0.0, 1337.5);

    p.controller.on_resize(600, 900, 0);
    p.controller.tick(150);
    p.viewport.scroll_to(0.0, 0.0);
    p.controller.tick(200);
    assert_eq!(p.viewport.scroll_offset(), (0.0, 1337.5));

    p.controller.on_resize(1280, 900, 1000);
    p.controller.tick(1150);
    p.viewport.scroll_to(0.0, 12.0);
    p.controller.tick(1200);
    assert_eq!(p.viewport.scroll_offset(), (0.0, 1337.5));
    assert_eq!(type_changes(&p.events.borrow()).len(), 2);
}

#[test]
fn component_failure_falls_back_and_recovers_once() {
    let mut p = page(1200);
    let monitor = p.controller.services().monitor.clone();
    p.surface.fail_next_mounts(1);

    p.controller.on_resize(700, 900, 0);
    p.controller.tick(150);
    assert!(p.controller.state().is_fallback());
    assert!(!p.controller.breakpoint().is_transitioning());
    let fallback = p.controller.fallback().unwrap();
    assert_eq!(fallback.active_route, "/attendance");
    assert!(!fallback.recovery_blocked);
    assert_eq!(p.reporter.len(), 1);
    assert_eq!(p.reporter.reports()[0].severity, Severity::Critical);

    p.controller.tick(151);
    assert_eq!(
        p.controller.state(),
        &ControllerState::Idle {
            mode: NavigationMode::Mobile
        }
    );
    assert!(p.controller.fallback().is_none());
    assert_eq!(monitor.events_of(MonitorEventKind::RecoverySucceeded).len(), 1);
    assert_eq!(p.controller.services().registry.len(), 1);
}

#[test]
fn repeated_failure_blocks_until_route_change() {
    let mut p = page(1200);
    let monitor = p.controller.services().monitor.clone();
    p.surface.fail_kind(NavigationMode::Mobile, true);

    p.controller.on_resize(700, 900, 0);
    p.controller.tick(150);
    p.controller.tick(160);
    assert!(p.controller.state().is_fallback());
    assert!(p.controller.fallback().unwrap().recovery_blocked);
    assert_eq!(monitor.events_of(MonitorEventKind::RecoveryBlocked).len(), 1);

    p.surface.fail_kind(NavigationMode::Mobile, false);
    let mounts_before = p.surface.mount_calls();
    p.controller.tick(500);
    p.controller.tick(5_000);
    assert!(p.controller.state().is_fallback());
    assert_eq!(p.surface.mount_calls(), mounts_before);

    p.controller.set_route("/leave", 6_000);
    assert!(p.controller.state().is_idle());
    let mounted = p.surface.mounted();
    assert_eq!(mounted.len(), 1);
    assert_eq!(mounted[0].1, NavigationMode::Mobile);
    assert_eq!(mounted[0].2, "/leave");
}

#[test]
fn reported_render_error_then_reload() {
    let mut p = page(1200);
    p.controller.report_component_error("sidebar threw during render", 10);
    assert!(p.controller.state().is_fallback());
    assert!(p.controller.services().registry.is_empty());
    assert!(p.dom.tagged_nodes().is_empty());

    p.controller.reload(20);
    assert!(p.controller.state().is_idle());
    assert_eq!(p.controller.services().registry.len(), 1);
}

#[test]
fn stale_component_from_another_controller_is_resolved() {
    let mut p = page(1200);
    let services = p.controller.services().clone();
    // A second, stale mobile navigation left mounted by an earlier page.
    p.dom.insert_node("stale-mobile", NavigationMode::Mobile);
    services
        .registry
        .register("stale-mobile", NavigationMode::Mobile, serde_json::json!({}), 1);

    p.controller.reload(50);
    assert!(!services.registry.contains("stale-mobile"));
    assert_eq!(services.registry.len(), 1);
    let resolved = services.monitor.events_of(MonitorEventKind::ConflictResolved);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].payload["type"], "both_types_visible");
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut out) => out.extend_from_slice(buf),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn transitions_emit_structured_logs() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("navarb=debug"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut p = page(1200);
        p.controller.on_resize(700, 900, 0);
        p.controller.tick(150);
        p.controller.tick(200);
    });

    let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("navarb.controller"), "{output}");
    assert!(output.contains("transition started"), "{output}");
    assert!(output.contains("transition settled"), "{output}");
    assert!(output.contains("navarb.breakpoint"), "{output}");
}
