//! Recorder configuration.
//!
//! [`MonitorConfig`] carries the switches the recorder needs: whether terminal events
//! are echoed to the console, whether and where the JSONL trace is written, and the
//! retention limits for finished calls and buffered events.

use crate::error::{MonitorError, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Default trace file, relative to the working directory.
pub const DEFAULT_TRACE_PATH: &str = "trace.jsonl";

/// Finalized records kept per call kind before the oldest are evicted.
pub const DEFAULT_MAX_FINISHED: usize = 1_000;

/// Events kept in the in-memory buffer before the oldest are dropped.
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Echo each terminal event to the console
    pub console_echo: bool,
    /// Append terminal events to `trace_path`
    pub file_output: bool,
    /// Target of the JSONL trace
    pub trace_path: PathBuf,
    /// Retention bound for finalized records, per call kind
    pub max_finished_per_kind: usize,
    /// Capacity of the in-memory event buffer
    pub max_buffered_events: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            console_echo: false,
            file_output: true,
            trace_path: PathBuf::from(DEFAULT_TRACE_PATH),
            max_finished_per_kind: DEFAULT_MAX_FINISHED,
            max_buffered_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl MonitorConfig {
    /// Build a configuration from the environment.
    ///
    /// A `.env` file in the working directory is loaded first if present. Recognized
    /// variables: `CALLTRACE_CONSOLE`, `CALLTRACE_FILE_OUTPUT`, `CALLTRACE_PATH`,
    /// `CALLTRACE_MAX_FINISHED`, `CALLTRACE_MAX_EVENTS`. Unset variables keep their
    /// defaults; values that fail to parse are reported as [`MonitorError::ConfigError`].
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CALLTRACE_CONSOLE") {
            config.console_echo = parse_flag("CALLTRACE_CONSOLE", &value)?;
        }
        if let Some(value) = lookup("CALLTRACE_FILE_OUTPUT") {
            config.file_output = parse_flag("CALLTRACE_FILE_OUTPUT", &value)?;
        }
        if let Some(value) = lookup("CALLTRACE_PATH") {
            if !value.trim().is_empty() {
                config.trace_path = PathBuf::from(value.trim());
            }
        }
        if let Some(value) = lookup("CALLTRACE_MAX_FINISHED") {
            config.max_finished_per_kind = parse_number("CALLTRACE_MAX_FINISHED", &value)?;
        }
        if let Some(value) = lookup("CALLTRACE_MAX_EVENTS") {
            config.max_buffered_events = parse_number("CALLTRACE_MAX_EVENTS", &value)?;
        }

        Ok(config)
    }

    pub fn with_console_echo(mut self, console_echo: bool) -> Self {
        self.console_echo = console_echo;
        self
    }

    pub fn with_trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_path = path.into();
        self.file_output = true;
        self
    }

    pub fn without_file_output(mut self) -> Self {
        self.file_output = false;
        self
    }

    pub fn with_max_finished(mut self, max: usize) -> Self {
        self.max_finished_per_kind = max;
        self
    }

    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_buffered_events = max;
        self
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(MonitorError::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        MonitorError::ConfigError(format!("{} must be a number, got '{}'", key, value))
    })
}
