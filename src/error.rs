//! Error types and result aliases for calltrace.
//!
//! The recorder's `start*`/`update*`/`end*` operations never surface errors to the
//! monitored workflow. [`MonitorError`] is used by the plumbing underneath them (sinks,
//! configuration, trace reading) so that failures can be logged at their origin.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Trace writer error: {0}")]
    WriterError(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
