//! The recorder facade.
//!
//! [`Recorder`] owns the per-kind registries, the in-memory event buffer and the trace
//! sink. Collaborators drive it through the [`CallMonitor`] operations: a `start_*` call
//! registers a record without writing anything, `update_tool_call_status` moves a tool
//! call through its phases, and an `end_*` call merges the terminal fields, computes the
//! derived durations and emits exactly one [`MonitoringEvent`].
//!
//! Construct one recorder per process and share it as `Arc<Recorder>` (or as
//! `Arc<dyn CallMonitor>`) with everything that makes calls. None of the operations
//! return errors or panic: unknown ids, repeated terminal calls and write failures are
//! absorbed and logged.

use super::clock::{format_timestamp, Clock, SystemClock};
use super::event_store::{EventCallback, EventStore};
use super::lifecycle::{
    self, ConfirmationTransition, EmbeddingOutcome, LlmOutcome, ToolOutcome,
};
use super::metrics::{
    CallKind, CallStatus, EmbeddingCallMetrics, LlmCallMetrics, MonitoringEvent,
    ToolCallMetrics, ToolCallStatus, UserConfirmationMetrics,
};
use super::normalizer::normalize;
use super::registry::CallRegistry;
use super::summary::MonitorSummary;
use super::trace_writer::{FileTraceWriter, TraceSink};
use crate::config::MonitorConfig;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// The mutation surface collaborators call into.
///
/// Implemented by [`Recorder`] and by [`NullRecorder`](super::NullRecorder), so
/// instrumented code can hold an `Arc<dyn CallMonitor>` whether or not monitoring is on.
pub trait CallMonitor: Send + Sync {
    fn start_llm_call(&self, id: &str, model: &str, prompt_id: &str, request_text: Option<Value>);

    #[allow(clippy::too_many_arguments)]
    fn end_llm_call(
        &self,
        id: &str,
        status: CallStatus,
        error: Option<String>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
        total_tokens: Option<u64>,
        response_text: Option<Value>,
    );

    fn start_tool_call(&self, id: &str, tool_name: &str, call_id: &str, prompt_id: &str, args: Value);

    fn update_tool_call_status(
        &self,
        id: &str,
        status: ToolCallStatus,
        execution_start_time: Option<i64>,
    );

    #[allow(clippy::too_many_arguments)]
    fn end_tool_call(
        &self,
        id: &str,
        status: ToolCallStatus,
        error: Option<String>,
        result: Option<Value>,
        result_display: Option<String>,
        response_parts: Option<Value>,
    );

    fn start_embedding_call(
        &self,
        id: &str,
        model: &str,
        prompt_id: &str,
        text_count: usize,
        texts: Option<Value>,
    );

    fn end_embedding_call(
        &self,
        id: &str,
        status: CallStatus,
        error: Option<String>,
        vector_dimensions: Option<usize>,
    );
}

/// Snapshot of every registry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllMetrics {
    pub llm_calls: Vec<LlmCallMetrics>,
    pub tool_calls: Vec<ToolCallMetrics>,
    pub embedding_calls: Vec<EmbeddingCallMetrics>,
    pub confirmations: Vec<UserConfirmationMetrics>,
}

pub struct Recorder {
    llm_calls: CallRegistry<LlmCallMetrics>,
    tool_calls: CallRegistry<ToolCallMetrics>,
    embedding_calls: CallRegistry<EmbeddingCallMetrics>,
    confirmations: CallRegistry<UserConfirmationMetrics>,
    event_store: EventStore,
    console_echo: AtomicBool,
    sink: RwLock<Option<Arc<dyn TraceSink>>>,
    clock: Arc<dyn Clock>,
}

impl Recorder {
    /// Create a recorder that writes to `config.trace_path` when file output is enabled
    pub fn new(config: &MonitorConfig) -> Self {
        let sink: Option<Arc<dyn TraceSink>> = if config.file_output {
            Some(Arc::new(FileTraceWriter::new(config.trace_path.clone())))
        } else {
            None
        };
        Self::build(config, sink)
    }

    /// Create a recorder that writes to a caller-supplied sink
    pub fn with_sink(config: &MonitorConfig, sink: Arc<dyn TraceSink>) -> Self {
        Self::build(config, Some(sink))
    }

    /// Create a recorder configured from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&MonitorConfig::from_env()?))
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `callback` for every event the recorder emits, after it is persisted
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_store = self.event_store.with_callback(callback);
        self
    }

    fn build(config: &MonitorConfig, sink: Option<Arc<dyn TraceSink>>) -> Self {
        let retention = config.max_finished_per_kind;
        Self {
            llm_calls: CallRegistry::new(retention),
            tool_calls: CallRegistry::new(retention),
            embedding_calls: CallRegistry::new(retention),
            confirmations: CallRegistry::new(retention),
            event_store: EventStore::new(config.max_buffered_events, None),
            console_echo: AtomicBool::new(config.console_echo),
            sink: RwLock::new(sink),
            clock: Arc::new(SystemClock),
        }
    }

    /// Reconfigure console echo and the trace file. `None` turns file output off.
    pub fn initialize(&self, console_echo: bool, file_target: Option<PathBuf>) {
        self.console_echo.store(console_echo, Ordering::SeqCst);
        let sink = file_target.map(|path| Arc::new(FileTraceWriter::new(path)) as Arc<dyn TraceSink>);
        self.set_sink(sink);
    }

    /// Swap the trace sink; `None` disables persistence
    pub fn set_sink(&self, sink: Option<Arc<dyn TraceSink>>) {
        *self.sink.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = sink;
    }

    pub fn is_console_echo(&self) -> bool {
        self.console_echo.load(Ordering::SeqCst)
    }

    pub fn has_sink(&self) -> bool {
        self.current_sink().is_some()
    }

    fn current_sink(&self) -> Option<Arc<dyn TraceSink>> {
        self.sink.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Normalize, echo, persist and buffer one event. Never fails.
    fn emit<T: Serialize>(&self, kind: CallKind, tag: &str, record: &T, at: i64) {
        let data = match serde_json::to_value(record) {
            Ok(value) => normalize(value),
            Err(e) => {
                warn!(%kind, event = tag, error = %e, "Failed to serialize monitoring record");
                return;
            }
        };

        let event = MonitoringEvent {
            timestamp: format_timestamp(at),
            kind,
            event: tag.to_string(),
            data,
        };

        if self.is_console_echo() {
            println!("{}", event.printable_summary());
        }

        if let Some(sink) = self.current_sink() {
            if let Err(e) = sink.append(&event) {
                warn!(%kind, event = tag, error = %e, "Failed to append monitoring event");
            }
        }

        self.event_store.store(event);
    }

    fn record_confirmation(&self, tool_call_id: &str, transition: ConfirmationTransition, at: i64) {
        let confirmation = UserConfirmationMetrics {
            id: Uuid::new_v4().to_string(),
            tool_call_id: tool_call_id.to_string(),
            confirmation_type: transition.confirmation_type,
            timestamp: at,
            waiting_duration: transition.waiting_duration,
        };

        self.confirmations.put(confirmation.id.clone(), confirmation.clone());
        self.emit(
            CallKind::UserConfirmation,
            transition.confirmation_type.as_str(),
            &confirmation,
            at,
        );
    }

    pub fn get_llm_metrics(&self, id: &str) -> Option<LlmCallMetrics> {
        self.llm_calls.get(id)
    }

    pub fn get_tool_metrics(&self, id: &str) -> Option<ToolCallMetrics> {
        self.tool_calls.get(id)
    }

    pub fn get_embedding_metrics(&self, id: &str) -> Option<EmbeddingCallMetrics> {
        self.embedding_calls.get(id)
    }

    /// All confirmation records, oldest first
    pub fn get_confirmations(&self) -> Vec<UserConfirmationMetrics> {
        self.confirmations.all()
    }

    pub fn get_all_metrics(&self) -> AllMetrics {
        AllMetrics {
            llm_calls: self.llm_calls.all(),
            tool_calls: self.tool_calls.all(),
            embedding_calls: self.embedding_calls.all(),
            confirmations: self.confirmations.all(),
        }
    }

    /// Copies of the buffered events, oldest first
    pub fn get_events(&self) -> Vec<MonitoringEvent> {
        self.event_store.events()
    }

    /// The event buffer, for filtered queries
    pub fn event_store(&self) -> &EventStore {
        &self.event_store
    }

    /// Reset every registry and the event buffer between independent runs
    pub fn clear_metrics(&self) {
        self.llm_calls.clear();
        self.tool_calls.clear();
        self.embedding_calls.clear();
        self.confirmations.clear();
        self.event_store.clear();
    }

    pub fn summary(&self) -> MonitorSummary {
        MonitorSummary::from_events(&self.event_store.events())
    }

    /// Print the aggregate report to stdout
    pub fn print_summary(&self) {
        println!("{}", self.summary().format_report());
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(&MonitorConfig::default())
    }
}

impl CallMonitor for Recorder {
    fn start_llm_call(&self, id: &str, model: &str, prompt_id: &str, request_text: Option<Value>) {
        let mut record = LlmCallMetrics::new(id, model, prompt_id, self.now());
        record.request_text = request_text;
        self.llm_calls.put(id, record);
    }

    fn end_llm_call(
        &self,
        id: &str,
        status: CallStatus,
        error: Option<String>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
        total_tokens: Option<u64>,
        response_text: Option<Value>,
    ) {
        let now = self.now();
        let outcome = LlmOutcome {
            status,
            error,
            input_tokens,
            output_tokens,
            total_tokens,
            response_text,
        };

        let finished = self.llm_calls.replace_with(id, |record| {
            lifecycle::finalize_llm(record, outcome, now).map(|done| (done.clone(), done))
        });

        match finished {
            Some(record) => self.emit(CallKind::LlmCall, status.as_str(), &record, now),
            None => debug!(id, "Ignoring end of unknown or finished LLM call"),
        }
    }

    fn start_tool_call(&self, id: &str, tool_name: &str, call_id: &str, prompt_id: &str, args: Value) {
        let record = ToolCallMetrics::new(id, tool_name, call_id, prompt_id, args, self.now());
        self.tool_calls.put(id, record);
    }

    fn update_tool_call_status(
        &self,
        id: &str,
        status: ToolCallStatus,
        execution_start_time: Option<i64>,
    ) {
        if status.is_terminal() {
            // A terminal status always goes through the single emission path
            self.end_tool_call(id, status, None, None, None, None);
            return;
        }

        let now = self.now();
        let transition = self.tool_calls.replace_with(id, |record| {
            lifecycle::apply_tool_status(record, status, execution_start_time, now)
        });

        match transition {
            Some(Some(transition)) => self.record_confirmation(id, transition, now),
            Some(None) => {}
            None => debug!(id, status = status.as_str(), "Ignoring update of unknown or finished tool call"),
        }
    }

    fn end_tool_call(
        &self,
        id: &str,
        status: ToolCallStatus,
        error: Option<String>,
        result: Option<Value>,
        result_display: Option<String>,
        response_parts: Option<Value>,
    ) {
        let now = self.now();
        let outcome = ToolOutcome {
            status,
            error,
            result,
            result_display,
            response_parts,
        };

        let finished = self.tool_calls.replace_with(id, |record| {
            lifecycle::finalize_tool(record, outcome, now).map(|done| (done.clone(), done))
        });

        match finished {
            Some(record) => self.emit(CallKind::ToolCall, status.as_str(), &record, now),
            None => debug!(id, "Ignoring end of unknown or finished tool call"),
        }
    }

    fn start_embedding_call(
        &self,
        id: &str,
        model: &str,
        prompt_id: &str,
        text_count: usize,
        texts: Option<Value>,
    ) {
        let mut record = EmbeddingCallMetrics::new(id, model, prompt_id, text_count, self.now());
        record.texts = texts;
        self.embedding_calls.put(id, record);
    }

    fn end_embedding_call(
        &self,
        id: &str,
        status: CallStatus,
        error: Option<String>,
        vector_dimensions: Option<usize>,
    ) {
        let now = self.now();
        let outcome = EmbeddingOutcome {
            status,
            error,
            vector_dimensions,
        };

        let finished = self.embedding_calls.replace_with(id, |record| {
            lifecycle::finalize_embedding(record, outcome, now).map(|done| (done.clone(), done))
        });

        match finished {
            Some(record) => self.emit(CallKind::EmbeddingCall, status.as_str(), &record, now),
            None => debug!(id, "Ignoring end of unknown or finished embedding call"),
        }
    }
}
