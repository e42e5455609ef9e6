//! Metrics records for each call kind and the persisted event envelope.
//!
//! Records serialize with camelCase field names and omit unset optional fields, so a
//! trace line carries exactly what was observed for that call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of call a record or event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    LlmCall,
    ToolCall,
    EmbeddingCall,
    UserConfirmation,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::LlmCall => "llm_call",
            CallKind::ToolCall => "tool_call",
            CallKind::EmbeddingCall => "embedding_call",
            CallKind::UserConfirmation => "user_confirmation",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an LLM or embedding call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Started,
    Completed,
    Error,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallStatus::Started)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Started => "started",
            CallStatus::Completed => "completed",
            CallStatus::Error => "error",
        }
    }
}

/// Status of a tool call as it moves through validation, approval and execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Started,
    Validating,
    AwaitingApproval,
    Scheduled,
    Executing,
    Completed,
    Error,
    Cancelled,
}

impl ToolCallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ToolCallStatus::Completed | ToolCallStatus::Error | ToolCallStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCallStatus::Started => "started",
            ToolCallStatus::Validating => "validating",
            ToolCallStatus::AwaitingApproval => "awaiting_approval",
            ToolCallStatus::Scheduled => "scheduled",
            ToolCallStatus::Executing => "executing",
            ToolCallStatus::Completed => "completed",
            ToolCallStatus::Error => "error",
            ToolCallStatus::Cancelled => "cancelled",
        }
    }
}

/// Kind of user confirmation transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationType {
    ApprovalRequested,
    ApprovalGranted,
}

impl ConfirmationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationType::ApprovalRequested => "approval_requested",
            ConfirmationType::ApprovalGranted => "approval_granted",
        }
    }
}

/// A single model invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmCallMetrics {
    pub id: String,
    pub model: String,
    pub prompt_id: String,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_text: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<Value>,
    #[serde(skip)]
    pub finalized: bool,
}

impl LlmCallMetrics {
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        prompt_id: impl Into<String>,
        start_time: i64,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            prompt_id: prompt_id.into(),
            start_time,
            end_time: None,
            duration: None,
            status: CallStatus::Started,
            error: None,
            input_tokens: None,
            output_tokens: None,
            total_tokens: None,
            request_text: None,
            response_text: None,
            finalized: false,
        }
    }
}

/// A single tool or script execution, including approval and execution sub-phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallMetrics {
    pub id: String,
    pub tool_name: String,
    pub call_id: String,
    pub prompt_id: String,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_parts: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_approval_start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_approval_end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_approval_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pure_execution_duration: Option<i64>,
    #[serde(skip)]
    pub finalized: bool,
}

impl ToolCallMetrics {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        prompt_id: impl Into<String>,
        args: Value,
        start_time: i64,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            prompt_id: prompt_id.into(),
            start_time,
            end_time: None,
            duration: None,
            status: ToolCallStatus::Started,
            error: None,
            args,
            result: None,
            result_display: None,
            response_parts: None,
            execution_start_time: None,
            execution_end_time: None,
            execution_duration: None,
            awaiting_approval_start_time: None,
            awaiting_approval_end_time: None,
            awaiting_approval_duration: None,
            pure_execution_duration: None,
            finalized: false,
        }
    }
}

/// A batch embedding computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingCallMetrics {
    pub id: String,
    pub model: String,
    pub prompt_id: String,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub text_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texts: Option<Value>,
    #[serde(skip)]
    pub finalized: bool,
}

impl EmbeddingCallMetrics {
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        prompt_id: impl Into<String>,
        text_count: usize,
        start_time: i64,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            prompt_id: prompt_id.into(),
            start_time,
            end_time: None,
            duration: None,
            status: CallStatus::Started,
            error: None,
            text_count,
            vector_dimensions: None,
            texts: None,
            finalized: false,
        }
    }
}

/// Point-in-time record of an approval request or grant. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfirmationMetrics {
    pub id: String,
    pub tool_call_id: String,
    pub confirmation_type: ConfirmationType,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_duration: Option<i64>,
}

/// One persisted trace line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringEvent {
    /// Emission instant, RFC 3339 UTC with millisecond precision
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: CallKind,
    /// Terminal or transition tag (`completed`, `error`, `cancelled`, `approval_requested`, ...)
    pub event: String,
    pub data: Value,
}

impl MonitoringEvent {
    /// Epoch milliseconds of the emission instant, if the timestamp parses
    pub fn timestamp_ms(&self) -> Option<i64> {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.timestamp_millis())
    }

    /// Id of the call this event belongs to
    pub fn call_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    /// An integer field of `data`, such as `duration`
    pub fn data_i64(&self, field: &str) -> Option<i64> {
        self.data.get(field).and_then(Value::as_i64)
    }

    /// A string field of `data`, such as `model` or `toolName`
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// One-line human readable summary, used for console echo
    pub fn printable_summary(&self) -> String {
        let mut summary = format!("[{}] {}.{}", self.timestamp, self.kind, self.event);

        let subject = match self.kind {
            CallKind::LlmCall | CallKind::EmbeddingCall => self.data_str("model"),
            CallKind::ToolCall => self.data_str("toolName"),
            CallKind::UserConfirmation => self.data_str("toolCallId"),
        };
        if let Some(subject) = subject {
            summary.push_str(&format!(" {}", subject));
        }
        if let Some(id) = self.call_id() {
            summary.push_str(&format!(" (id: {})", id));
        }
        if let Some(duration) = self.data_i64("duration") {
            summary.push_str(&format!(" {}ms", duration));
        }
        if let Some(waiting) = self.data_i64("waitingDuration") {
            summary.push_str(&format!(" waited {}ms", waiting));
        }
        if let Some(tokens) = self.data_i64("totalTokens") {
            summary.push_str(&format!(", {} tokens", tokens));
        }
        if let Some(error) = self.data_str("error") {
            summary.push_str(&format!(" error: {}", error));
        }

        summary
    }
}
