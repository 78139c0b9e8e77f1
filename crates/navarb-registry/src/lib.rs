#![forbid(unsafe_code)]

//! Component registry and single-owner conflict detection.
//!
//! At any instant exactly one navigation kind may be mounted, and only one
//! instance of it. [`ComponentRegistry`] records what components claim,
//! a [`VisibilityProbe`] reports what is rendered, and [`ConflictDetector`]
//! reconciles the two, logging every finding to the
//! [`navarb_monitor::NavigationMonitor`].
//!
//! All three are clonable handles over shared state so several controllers
//! on one page observe the same ground truth.

pub mod conflict;
pub mod probe;
pub mod registry;

pub use conflict::{
    ConflictDetector, ConflictKind, ConflictRecord, ConflictResolution, DEFAULT_MARGIN_TOLERANCE_PX,
    DetectionContext, DetectorStatus, ResolutionReport,
};
pub use probe::{HeadlessDom, ProbeNode, VisibilityProbe};
pub use registry::{ComponentRegistry, Registration};
