//! Null recorder following the Null Object Pattern
//!
//! [`NullRecorder`] implements [`CallMonitor`] and discards everything, so instrumented
//! code can always call into a monitor without checking whether monitoring is enabled.

use super::metrics::{CallStatus, ToolCallStatus};
use super::recorder::CallMonitor;
use serde_json::Value;

/// A [`CallMonitor`] that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl NullRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl CallMonitor for NullRecorder {
    fn start_llm_call(&self, _id: &str, _model: &str, _prompt_id: &str, _request_text: Option<Value>) {}

    fn end_llm_call(
        &self,
        _id: &str,
        _status: CallStatus,
        _error: Option<String>,
        _input_tokens: Option<u64>,
        _output_tokens: Option<u64>,
        _total_tokens: Option<u64>,
        _response_text: Option<Value>,
    ) {
    }

    fn start_tool_call(&self, _id: &str, _tool_name: &str, _call_id: &str, _prompt_id: &str, _args: Value) {}

    fn update_tool_call_status(
        &self,
        _id: &str,
        _status: ToolCallStatus,
        _execution_start_time: Option<i64>,
    ) {
    }

    fn end_tool_call(
        &self,
        _id: &str,
        _status: ToolCallStatus,
        _error: Option<String>,
        _result: Option<Value>,
        _result_display: Option<String>,
        _response_parts: Option<Value>,
    ) {
    }

    fn start_embedding_call(
        &self,
        _id: &str,
        _model: &str,
        _prompt_id: &str,
        _text_count: usize,
        _texts: Option<Value>,
    ) {
    }

    fn end_embedding_call(
        &self,
        _id: &str,
        _status: CallStatus,
        _error: Option<String>,
        _vector_dimensions: Option<usize>,
    ) {
    }
}
