//! Property tests: at most one navigation component is live at any time, and
//! the controller always comes to rest in the mode its last width implies.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use navarb_core::{BreakpointPolicy, ViewportSample};
use navarb_monitor::MonitorEventKind;
use navarb_registry::HeadlessDom;
use navarb_runtime::{
    ControllerEvent, HeadlessSurface, HeadlessViewport, NavigationConfig, NavigationController,
    NavigationServices,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Resize(u32),
    Orientation(u32),
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (320u32..1600).prop_map(Op::Resize),
        1 => (320u32..1600).prop_map(Op::Orientation),
        4 => (0u64..400).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn single_live_component_and_quiescent_mode(
        start in 320u32..1600,
        ops in proptest::collection::vec(op_strategy(), 1..40),
    ) {
        let config = NavigationConfig::default();
        let policy = BreakpointPolicy::default();
        let dom = HeadlessDom::new();
        let surface = HeadlessSurface::new(dom.clone());
        let services = NavigationServices::new(&config, Arc::new(dom.clone()));
        let mut controller = NavigationController::builder(config, services.clone()).mount(
            Box::new(HeadlessViewport::new(dom.clone())),
            Box::new(surface.clone()),
            ViewportSample::new(start, 900, 0),
        );
        let type_changes = Rc::new(Cell::new(0usize));
        let _subscription = {
            let type_changes = Rc::clone(&type_changes);
            controller.subscribe(move |event| {
                if matches!(event, ControllerEvent::NavigationTypeChange { .. }) {
                    type_changes.set(type_changes.get() + 1);
                }
            })
        };

        let mut now = 0u64;
        let mut last_width = start;
        for op in ops {
            match op {
                Op::Resize(width) => {
                    controller.on_resize(width, 900, now);
                    last_width = width;
                }
                Op::Orientation(width) => {
                    controller.on_orientation_change(width, 900, now);
                    last_width = width;
                }
                Op::Advance(dt) => {
                    now += dt;
                    controller.tick(now);
                }
            }
            prop_assert!(surface.mounted().len() <= 1);
            prop_assert_eq!(
                controller.state().is_transitioning(),
                controller.breakpoint().is_transitioning()
            );
        }

        // Quiet period: debounce, settle, and any deferred re-evaluation.
        for _ in 0..4 {
            now += 1_000;
            controller.tick(now);
        }

        let expected = policy.mode_for(last_width);
        prop_assert!(controller.state().is_idle());
        prop_assert_eq!(controller.mode(), expected);
        prop_assert_eq!(controller.mounted().map(|m| m.kind), Some(expected));
        prop_assert_eq!(services.registry.len(), 1);
        prop_assert_eq!(surface.mounted().len(), 1);
        prop_assert_eq!(
            services.monitor.events_of(MonitorEventKind::NavigationSwitch).len(),
            type_changes.get()
        );
    }
}
