#![forbid(unsafe_code)]

//! Scenario replay for navarb.
//!
//! Drives a [`navarb::HeadlessPage`] through a scripted sequence of resizes,
//! ticks, route changes, and injected failures, then reports the emitted
//! controller events and debug snapshots as JSON.

pub mod cli;
pub mod error;
pub mod scenario;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{HarnessError, Result};
pub use scenario::{InitialPage, Scenario, ScenarioReport, Step, StepAction, run_scenario};

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `navarb=info`).
///
/// Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("navarb=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
