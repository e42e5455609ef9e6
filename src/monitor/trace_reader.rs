//! Reading a JSONL trace back for offline analysis.

use super::metrics::MonitoringEvent;
use super::summary::MonitorSummary;
use crate::error::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Parse every event in a trace file.
///
/// Blank lines are skipped. Lines that are not valid events are logged and skipped, so a
/// partially written last line does not hide the rest of the trace.
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<MonitoringEvent>> {
    let file = File::open(path.as_ref())?;
    parse_trace(BufReader::new(file))
}

/// Parse events from any line-oriented reader
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<MonitoringEvent>> {
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<MonitoringEvent>(trimmed) {
            Ok(event) => events.push(event),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed trace line"),
        }
    }

    Ok(events)
}

/// Read a trace file and summarize it
pub fn summarize_trace(path: impl AsRef<Path>) -> Result<MonitorSummary> {
    Ok(MonitorSummary::from_events(&read_trace(path)?))
}
