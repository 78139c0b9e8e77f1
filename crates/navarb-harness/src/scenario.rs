#![forbid(unsafe_code)]

//! Scenario files and their replay against a headless page.
//!
//! A scenario is a JSON document with an initial viewport and a list of
//! timestamped steps. Steps run in order; `at_ms` must never decrease.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use navarb::{
    ControllerEvent, DebugSnapshot, DeterministicClock, HeadlessPage, NavigationConfig,
    NavigationMode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

fn default_route() -> String {
    "/dashboard".to_string()
}

fn default_height() -> u32 {
    900
}

/// Viewport and route the page is mounted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPage {
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_route")]
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepAction {
    Resize {
        width: u32,
        #[serde(default = "default_height")]
        height: u32,
    },
    Orientation {
        width: u32,
        #[serde(default = "default_height")]
        height: u32,
    },
    Tick,
    Route {
        route: String,
    },
    Collapse {
        collapsed: bool,
    },
    Toggle,
    ComponentError {
        message: String,
    },
    Reload,
    /// Width the host would report on a direct read; `null` clears it.
    LiveWidth {
        width: Option<u32>,
    },
    Scroll {
        x: f64,
        y: f64,
    },
    FailMounts {
        count: u32,
    },
    FailKind {
        kind: NavigationMode,
        fail: bool,
    },
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub initial: InitialPage,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(s)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HarnessError::MissingScenario {
                path: path.to_path_buf(),
            });
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        if self.initial.width == 0 {
            return Err(HarnessError::invalid("initial width must be positive"));
        }
        let mut last = 0u64;
        for (index, step) in self.steps.iter().enumerate() {
            if step.at_ms < last {
                return Err(HarnessError::invalid(format!(
                    "step {index} at {}ms runs before the previous step at {last}ms",
                    step.at_ms
                )));
            }
            last = step.at_ms;
        }
        Ok(())
    }
}

/// Everything a replay produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps_run: usize,
    pub events: Vec<ControllerEvent>,
    /// Snapshots requested by `snapshot` steps, in order.
    pub snapshots: Vec<DebugSnapshot>,
    #[serde(rename = "final")]
    pub final_snapshot: DebugSnapshot,
}

type ReplayPage = HeadlessPage<DeterministicClock>;

/// Replay `scenario` on a fresh headless page whose clock follows `at_ms`.
pub fn run_scenario(scenario: &Scenario, config: NavigationConfig) -> ScenarioReport {
    let initial = &scenario.initial;
    let mut page = HeadlessPage::replay(config, &initial.route, initial.width, initial.height);
    let events = Rc::new(RefCell::new(Vec::new()));
    let _subscription = {
        let events = Rc::clone(&events);
        page.controller.subscribe(move |event| events.borrow_mut().push(event.clone()))
    };

    let mut snapshots = Vec::new();
    for step in &scenario.steps {
        page.advance_to(step.at_ms);
        debug!(target: "navarb.harness", at_ms = step.at_ms, action = ?step.action, "step");
        apply_step(&mut page, &step.action, &mut snapshots);
    }

    info!(
        target: "navarb.harness",
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        mode = %page.controller.mode(),
        "scenario finished"
    );
    let events = events.borrow().clone();
    ScenarioReport {
        name: scenario.name.clone(),
        steps_run: scenario.steps.len(),
        events,
        snapshots,
        final_snapshot: page.snapshot(),
    }
}

fn apply_step(page: &mut ReplayPage, action: &StepAction, snapshots: &mut Vec<DebugSnapshot>) {
    let now_ms = page.now_ms();
    match action {
        StepAction::Resize { width, height } => page.resize(*width, *height),
        StepAction::Orientation { width, height } => page.rotate(*width, *height),
        StepAction::Tick => page.tick(),
        StepAction::Route { route } => page.controller.set_route(route.as_str(), now_ms),
        StepAction::Collapse { collapsed } => page.controller.set_collapsed(*collapsed, now_ms),
        StepAction::Toggle => {
            page.controller.toggle_collapsed(now_ms);
        }
        StepAction::ComponentError { message } => {
            page.controller.report_component_error(message, now_ms);
        }
        StepAction::Reload => page.controller.reload(now_ms),
        StepAction::LiveWidth { width } => page.viewport.set_live_width(*width),
        StepAction::Scroll { x, y } => page.viewport.scroll_to(*x, *y),
        StepAction::FailMounts { count } => page.surface.fail_next_mounts(*count),
        StepAction::FailKind { kind, fail } => page.surface.fail_kind(*kind, *fail),
        StepAction::Snapshot => snapshots.push(page.snapshot()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scenario(steps: &str) -> Scenario {
        Scenario::from_json_str(&format!(
            r#"{{"name":"t","initial":{{"width":1280}},"steps":{steps}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn steps_parse_with_defaults() {
        let s = scenario(r#"[{"at_ms":0,"op":"resize","width":700},{"at_ms":150,"op":"tick"}]"#);
        assert_eq!(s.initial.route, "/dashboard");
        assert_eq!(
            s.steps[0].action,
            StepAction::Resize {
                width: 700,
                height: 900
            }
        );
        assert_eq!(s.steps[1].action, StepAction::Tick);
    }

    #[test]
    fn out_of_order_steps_are_rejected() {
        let err = Scenario::from_json_str(
            r#"{"initial":{"width":1280},"steps":[{"at_ms":10,"op":"tick"},{"at_ms":5,"op":"tick"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn replay_switches_to_mobile() {
        let s = scenario(
            r#"[{"at_ms":0,"op":"resize","width":700},
                {"at_ms":150,"op":"tick"},
                {"at_ms":200,"op":"tick"},
                {"at_ms":200,"op":"snapshot"}]"#,
        );
        let report = run_scenario(&s, NavigationConfig::default());
        assert_eq!(report.steps_run, 4);
        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.snapshots[0].captured_at_ms, 200);
        assert_eq!(report.final_snapshot.captured_at_ms, 200);
        let breakpoint = report.final_snapshot.breakpoint.as_ref().unwrap();
        assert_eq!(breakpoint.mode, NavigationMode::Mobile);
        assert!(report.events.iter().any(|e| matches!(
            e,
            ControllerEvent::NavigationTypeChange {
                to: NavigationMode::Mobile,
                ..
            }
        )));
    }
}
