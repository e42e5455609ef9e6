//! Durable JSONL output for terminal events.
//!
//! A [`TraceSink`] receives each finished [`MonitoringEvent`] once. [`FileTraceWriter`]
//! turns it into one self-contained JSON line and appends it to the trace file right
//! away. There is no batching, so the file can be tailed while the workflow runs.

use super::metrics::MonitoringEvent;
use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Destination for persisted events
pub trait TraceSink: Send + Sync {
    /// Append one event. Implementations must not interleave the bytes of concurrent appends.
    fn append(&self, event: &MonitoringEvent) -> Result<()>;
}

/// Serialize an event as a single newline-terminated JSON line
pub fn to_line(event: &MonitoringEvent) -> Result<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// Appends events to a JSONL file, one line per event
#[derive(Debug)]
pub struct FileTraceWriter {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTraceWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for FileTraceWriter {
    fn append(&self, event: &MonitoringEvent) -> Result<()> {
        // Serialize outside the critical section
        let line = to_line(event)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps serialized lines in memory; handy for tests and for hosts that ship lines elsewhere
#[derive(Debug, Default, Clone)]
pub struct MemoryTraceSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Parse the stored lines back into events
    pub fn events(&self) -> Vec<MonitoringEvent> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for MemoryTraceSink {
    fn append(&self, event: &MonitoringEvent) -> Result<()> {
        let line = to_line(event)?;
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
        Ok(())
    }
}
