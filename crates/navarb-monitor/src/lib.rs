#![forbid(unsafe_code)]

//! Navigation monitor: a durable, bounded record of what happened.
//!
//! Every mode switch, conflict, error, and recovery flows through
//! [`NavigationMonitor`]. The log is append-only and capped with FIFO
//! eviction. Critical events escalate synchronously to a
//! [`CriticalReporter`]. An optional [`MonitorSink`] mirrors each event as a
//! JSONL line for log pipelines.
//!
//! The monitor is an explicitly constructed service. Clone the handle to
//! share it between controllers and the debugger; call
//! [`NavigationMonitor::reset`] between tests.

pub mod event;
pub mod monitor;
pub mod reporter;
pub mod sink;

pub use event::{MonitorEvent, MonitorEventKind, Severity};
pub use monitor::{MonitorConfig, MonitorExport, MonitorMetrics, NavigationMonitor};
pub use reporter::{CriticalReporter, MemoryReporter, TracingReporter};
pub use sink::{MONITOR_SCHEMA_VERSION, MonitorSink, MonitorSinkConfig, MonitorSinkDestination};
