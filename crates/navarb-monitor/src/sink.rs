#![forbid(unsafe_code)]

//! JSONL mirror for monitor events.
//!
//! A shared, line-oriented sink that writes each [`MonitorEvent`] as one JSON
//! object per line. Ordering matches call order because writes are
//! serialized behind a mutex. Flush behavior is explicit and configurable.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::event::MonitorEvent;

/// Schema version stamped on every JSONL line.
pub const MONITOR_SCHEMA_VERSION: &str = "navarb-monitor-v1";

/// Destination for JSONL output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorSinkDestination {
    Stdout,
    /// Append to a file at the given path.
    File(PathBuf),
}

impl MonitorSinkDestination {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

/// Configuration for the JSONL mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSinkConfig {
    pub enabled: bool,
    pub destination: MonitorSinkDestination,
    /// Flush after every line.
    pub flush_on_write: bool,
}

impl Default for MonitorSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: MonitorSinkDestination::Stdout,
            flush_on_write: true,
        }
    }
}

impl MonitorSinkConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enabled_stdout() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn enabled_file(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            destination: MonitorSinkDestination::file(path),
            flush_on_write: true,
        }
    }

    #[must_use]
    pub fn with_flush_on_write(mut self, enabled: bool) -> Self {
        self.flush_on_write = enabled;
        self
    }
}

struct SinkInner {
    writer: BufWriter<Box<dyn Write + Send>>,
    flush_on_write: bool,
}

/// Shared JSONL writer.
#[derive(Clone)]
pub struct MonitorSink {
    inner: Arc<Mutex<SinkInner>>,
}

impl std::fmt::Debug for MonitorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorSink").finish()
    }
}

#[derive(Serialize)]
struct SinkLine<'a> {
    schema: &'static str,
    #[serde(flatten)]
    event: &'a MonitorEvent,
}

impl MonitorSink {
    /// Build a sink from config. Returns `Ok(None)` when disabled.
    pub fn from_config(config: &MonitorSinkConfig) -> io::Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let writer: Box<dyn Write + Send> = match &config.destination {
            MonitorSinkDestination::Stdout => Box::new(io::stdout()),
            MonitorSinkDestination::File(path) => {
                Box::new(OpenOptions::new().create(true).append(true).open(path)?)
            }
        };
        Ok(Some(Self::from_writer(writer, config.flush_on_write)))
    }

    /// Wrap an arbitrary writer.
    #[must_use]
    pub fn from_writer(writer: Box<dyn Write + Send>, flush_on_write: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SinkInner {
                writer: BufWriter::new(writer),
                flush_on_write,
            })),
        }
    }

    /// Write one event as a JSONL line.
    pub fn write_event(&self, event: &MonitorEvent) -> io::Result<()> {
        let line = serde_json::to_string(&SinkLine {
            schema: MONITOR_SCHEMA_VERSION,
            event,
        })
        .map_err(io::Error::other)?;
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.writer.write_all(line.as_bytes())?;
        inner.writer.write_all(b"\n")?;
        if inner.flush_on_write {
            inner.writer.flush()?;
        }
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.writer.flush()
    }
}
