//! Call-lifecycle monitoring for agentic workflows
//!
//! The monitor records every model invocation, tool execution and embedding call a
//! workflow makes, and writes one structured line per finished call to an append-only
//! JSONL trace for post-hoc performance analysis.
//!
//! # Architecture
//!
//! - **Recorder**: the facade collaborators call (`start_*`, `update_tool_call_status`, `end_*`)
//! - **CallRegistry**: per-kind map from call id to its current metrics record
//! - **lifecycle**: tool-call state machine and derived durations
//! - **normalizer**: turns JSON-encoded string payloads into nested values
//! - **TraceSink**: durable output (`FileTraceWriter`, `QueuedTraceWriter`)
//! - **EventStore**: bounded in-memory copy of emitted events
//! - **NullRecorder**: null object for when monitoring is disabled
//!
//! # Trace format
//!
//! Each line is a self-contained JSON object:
//!
//! ```text
//! {"timestamp":"2026-01-01T00:00:00.800Z","type":"tool_call","event":"completed","data":{...}}
//! ```
//!
//! `type` is one of `llm_call`, `tool_call`, `embedding_call`, `user_confirmation`.
//! Started calls are never written; each call produces one line when it ends.
//! Approval requests and grants are written as `user_confirmation` lines when they happen.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use calltrace::monitor::{CallMonitor, CallStatus, Recorder};
//! use calltrace::MonitorConfig;
//!
//! let recorder = Recorder::new(&MonitorConfig::default());
//!
//! recorder.start_llm_call("l1", "model-x", "prompt-1", None);
//! // ... invoke the model ...
//! recorder.end_llm_call("l1", CallStatus::Completed, None, Some(10), Some(5), Some(15), None);
//!
//! recorder.print_summary();
//! ```

pub mod clock;
pub mod event_store;
pub mod lifecycle;
pub mod metrics;
pub mod normalizer;
pub mod null_recorder;
pub mod queued_writer;
pub mod recorder;
pub mod registry;
pub mod summary;
pub mod trace_reader;
pub mod trace_writer;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use event_store::{EventCallback, EventStore};
pub use metrics::{
    CallKind, CallStatus, ConfirmationType, EmbeddingCallMetrics, LlmCallMetrics,
    MonitoringEvent, ToolCallMetrics, ToolCallStatus, UserConfirmationMetrics,
};
pub use normalizer::normalize;
pub use null_recorder::NullRecorder;
pub use queued_writer::QueuedTraceWriter;
pub use recorder::{AllMetrics, CallMonitor, Recorder};
pub use registry::CallRegistry;
pub use summary::MonitorSummary;
pub use trace_reader::{read_trace, summarize_trace};
pub use trace_writer::{FileTraceWriter, MemoryTraceSink, TraceSink};
