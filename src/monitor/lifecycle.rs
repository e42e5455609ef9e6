//! Call lifecycle transitions and derived-metric arithmetic.
//!
//! Tool calls move through `started -> validating -> awaiting_approval -> scheduled ->
//! executing -> {completed | error | cancelled}`, driven entirely by explicit status
//! updates. LLM and embedding calls go straight from `started` to a terminal status.
//!
//! The functions here are pure: they take the current record and the current time and
//! return the replacement record. The recorder applies them under the registry lock.

use super::metrics::{
    CallStatus, ConfirmationType, EmbeddingCallMetrics, LlmCallMetrics, ToolCallMetrics,
    ToolCallStatus,
};
use serde_json::Value;

/// Approval transition produced by a tool status update
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationTransition {
    pub confirmation_type: ConfirmationType,
    pub waiting_duration: Option<i64>,
}

/// Terminal fields supplied by the caller when a tool call ends
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub status: ToolCallStatus,
    pub error: Option<String>,
    pub result: Option<Value>,
    pub result_display: Option<String>,
    pub response_parts: Option<Value>,
}

/// Terminal fields supplied by the caller when an LLM call ends
#[derive(Debug, Clone, PartialEq)]
pub struct LlmOutcome {
    pub status: CallStatus,
    pub error: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub response_text: Option<Value>,
}

/// Terminal fields supplied by the caller when an embedding call ends
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutcome {
    pub status: CallStatus,
    pub error: Option<String>,
    pub vector_dimensions: Option<usize>,
}

/// Apply a non-terminal status update to a tool call.
///
/// Returns `None` if the record is already finalized. Terminal statuses belong to
/// [`finalize_tool`]; passed here they only update `status`.
///
/// The approval wait closes on the first move out of `awaiting_approval`, whether the
/// call goes to `scheduled` or straight to `executing`.
pub fn apply_tool_status(
    mut record: ToolCallMetrics,
    new_status: ToolCallStatus,
    execution_start_time: Option<i64>,
    now: i64,
) -> Option<(ToolCallMetrics, Option<ConfirmationTransition>)> {
    if record.finalized {
        return None;
    }

    let previous = record.status;
    let mut transition = None;

    match new_status {
        ToolCallStatus::AwaitingApproval => {
            record.awaiting_approval_start_time = Some(now);
            record.awaiting_approval_end_time = None;
            record.awaiting_approval_duration = None;
            transition = Some(ConfirmationTransition {
                confirmation_type: ConfirmationType::ApprovalRequested,
                waiting_duration: None,
            });
        }
        _ if previous == ToolCallStatus::AwaitingApproval => {
            if let Some(waited) = close_approval_wait(&mut record, now) {
                transition = Some(ConfirmationTransition {
                    confirmation_type: ConfirmationType::ApprovalGranted,
                    waiting_duration: Some(waited),
                });
            }
        }
        _ => {}
    }

    if new_status == ToolCallStatus::Executing {
        if let Some(started) = execution_start_time {
            record.execution_start_time = Some(started);
        }
    }

    record.status = new_status;
    Some((record, transition))
}

/// End an open approval wait at `now` and return its length.
///
/// Does nothing without a recorded start, or if the wait was already closed.
fn close_approval_wait(record: &mut ToolCallMetrics, now: i64) -> Option<i64> {
    let approval_start = record.awaiting_approval_start_time?;
    if record.awaiting_approval_end_time.is_some() {
        return None;
    }
    let waited = now.saturating_sub(approval_start);
    record.awaiting_approval_end_time = Some(now);
    record.awaiting_approval_duration = Some(waited);
    Some(waited)
}

/// Merge terminal fields into a tool call and compute its durations.
///
/// Returns `None` if the record was already finalized.
pub fn finalize_tool(
    mut record: ToolCallMetrics,
    outcome: ToolOutcome,
    now: i64,
) -> Option<ToolCallMetrics> {
    if record.finalized {
        return None;
    }

    // A call denied or cancelled while waiting still reports how long it waited
    if record.status == ToolCallStatus::AwaitingApproval {
        close_approval_wait(&mut record, now);
    }

    let duration = now.saturating_sub(record.start_time);
    record.status = outcome.status;
    record.end_time = Some(now);
    record.duration = Some(duration);

    if let Some(execution_start) = record.execution_start_time {
        record.execution_end_time = Some(now);
        record.execution_duration = Some(now.saturating_sub(execution_start));
    }

    // Not clamped: inconsistent timestamps surface as negative values
    record.pure_execution_duration =
        Some(duration.saturating_sub(record.awaiting_approval_duration.unwrap_or(0)));

    if outcome.error.is_some() {
        record.error = outcome.error;
    }
    if outcome.result.is_some() {
        record.result = outcome.result;
    }
    if outcome.result_display.is_some() {
        record.result_display = outcome.result_display;
    }
    if outcome.response_parts.is_some() {
        record.response_parts = outcome.response_parts;
    }

    record.finalized = true;
    Some(record)
}

/// Merge terminal fields into an LLM call and compute its duration.
///
/// `total_tokens` falls back to `input + output` when only the parts are known.
pub fn finalize_llm(
    mut record: LlmCallMetrics,
    outcome: LlmOutcome,
    now: i64,
) -> Option<LlmCallMetrics> {
    if record.finalized {
        return None;
    }

    record.status = outcome.status;
    record.end_time = Some(now);
    record.duration = Some(now.saturating_sub(record.start_time));
    record.error = outcome.error;
    record.input_tokens = outcome.input_tokens;
    record.output_tokens = outcome.output_tokens;
    record.total_tokens = outcome.total_tokens.or_else(|| {
        match (outcome.input_tokens, outcome.output_tokens) {
            (Some(input), Some(output)) => Some(input.saturating_add(output)),
            _ => None,
        }
    });
    if outcome.response_text.is_some() {
        record.response_text = outcome.response_text;
    }

    record.finalized = true;
    Some(record)
}

/// Merge terminal fields into an embedding call and compute its duration.
pub fn finalize_embedding(
    mut record: EmbeddingCallMetrics,
    outcome: EmbeddingOutcome,
    now: i64,
) -> Option<EmbeddingCallMetrics> {
    if record.finalized {
        return None;
    }

    record.status = outcome.status;
    record.end_time = Some(now);
    record.duration = Some(now.saturating_sub(record.start_time));
    record.error = outcome.error;
    if outcome.vector_dimensions.is_some() {
        record.vector_dimensions = outcome.vector_dimensions;
    }

    record.finalized = true;
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(start: i64) -> ToolCallMetrics {
        ToolCallMetrics::new("t1", "run_shell_command", "c1", "p1", json!({"cmd": "ls"}), start)
    }

    fn completed() -> ToolOutcome {
        ToolOutcome {
            status: ToolCallStatus::Completed,
            error: None,
            result: Some(json!("ok")),
            result_display: None,
            response_parts: None,
        }
    }

    #[test]
    fn test_entering_approval_records_start() {
        let (record, transition) =
            apply_tool_status(tool(0), ToolCallStatus::AwaitingApproval, None, 100).unwrap();

        assert_eq!(record.status, ToolCallStatus::AwaitingApproval);
        assert_eq!(record.awaiting_approval_start_time, Some(100));
        assert_eq!(
            transition,
            Some(ConfirmationTransition {
                confirmation_type: ConfirmationType::ApprovalRequested,
                waiting_duration: None,
            })
        );
    }

    #[test]
    fn test_approval_granted_computes_wait() {
        let (record, _) =
            apply_tool_status(tool(0), ToolCallStatus::AwaitingApproval, None, 0).unwrap();
        let (record, transition) =
            apply_tool_status(record, ToolCallStatus::Executing, None, 500).unwrap();

        assert_eq!(record.awaiting_approval_end_time, Some(500));
        assert_eq!(record.awaiting_approval_duration, Some(500));
        assert_eq!(transition.unwrap().waiting_duration, Some(500));
    }

    #[test]
    fn test_approval_without_start_time_fabricates_nothing() {
        let mut record = tool(0);
        record.status = ToolCallStatus::AwaitingApproval;

        let (record, transition) =
            apply_tool_status(record, ToolCallStatus::Executing, None, 500).unwrap();

        assert!(transition.is_none());
        assert!(record.awaiting_approval_end_time.is_none());
        assert!(record.awaiting_approval_duration.is_none());
    }

    #[test]
    fn test_executing_without_approval_has_no_transition() {
        let (record, transition) =
            apply_tool_status(tool(0), ToolCallStatus::Executing, None, 50).unwrap();
        assert!(transition.is_none());
        assert_eq!(record.status, ToolCallStatus::Executing);
        assert!(record.execution_start_time.is_none());
    }

    #[test]
    fn test_execution_start_stored_verbatim() {
        let (record, _) =
            apply_tool_status(tool(0), ToolCallStatus::Executing, Some(40), 90).unwrap();
        assert_eq!(record.execution_start_time, Some(40));
    }

    #[test]
    fn test_intermediate_statuses_only_set_status() {
        let (record, transition) =
            apply_tool_status(tool(0), ToolCallStatus::Validating, None, 10).unwrap();
        assert_eq!(record.status, ToolCallStatus::Validating);
        assert!(transition.is_none());

        let (record, _) = apply_tool_status(record, ToolCallStatus::Scheduled, None, 20).unwrap();
        assert_eq!(record.status, ToolCallStatus::Scheduled);
        assert!(record.awaiting_approval_start_time.is_none());
    }

    #[test]
    fn test_finalize_tool_durations() {
        let (record, _) =
            apply_tool_status(tool(0), ToolCallStatus::AwaitingApproval, None, 0).unwrap();
        let (record, _) =
            apply_tool_status(record, ToolCallStatus::Executing, Some(500), 500).unwrap();
        let record = finalize_tool(record, completed(), 800).unwrap();

        assert_eq!(record.end_time, Some(800));
        assert_eq!(record.duration, Some(800));
        assert_eq!(record.execution_end_time, Some(800));
        assert_eq!(record.execution_duration, Some(300));
        assert_eq!(record.pure_execution_duration, Some(300));
        assert_eq!(record.result, Some(json!("ok")));
        assert!(record.finalized);
    }

    #[test]
    fn test_pure_execution_equals_duration_without_approval() {
        let record = finalize_tool(tool(100), completed(), 350).unwrap();
        assert_eq!(record.duration, Some(250));
        assert_eq!(record.pure_execution_duration, Some(250));
        assert!(record.execution_duration.is_none());
    }

    #[test]
    fn test_pure_execution_not_clamped() {
        let mut record = tool(0);
        record.awaiting_approval_duration = Some(900);
        let record = finalize_tool(record, completed(), 600).unwrap();
        assert_eq!(record.pure_execution_duration, Some(-300));
    }

    #[test]
    fn test_finalize_tool_twice_is_rejected() {
        let record = finalize_tool(tool(0), completed(), 10).unwrap();
        assert!(finalize_tool(record.clone(), completed(), 20).is_none());
        assert!(apply_tool_status(record, ToolCallStatus::Executing, None, 30).is_none());
    }

    #[test]
    fn test_finalize_tool_error_keeps_message() {
        let outcome = ToolOutcome {
            status: ToolCallStatus::Error,
            error: Some("exit status 1".to_string()),
            result: None,
            result_display: None,
            response_parts: None,
        };
        let record = finalize_tool(tool(0), outcome, 10).unwrap();
        assert_eq!(record.status, ToolCallStatus::Error);
        assert_eq!(record.error.as_deref(), Some("exit status 1"));
        assert!(record.result.is_none());
    }

    #[test]
    fn test_finalize_llm() {
        let record = LlmCallMetrics::new("l1", "model-x", "p1", 1_000);
        let outcome = LlmOutcome {
            status: CallStatus::Completed,
            error: None,
            input_tokens: Some(10),
            output_tokens: Some(5),
            total_tokens: Some(15),
            response_text: None,
        };
        let record = finalize_llm(record, outcome, 2_000).unwrap();

        assert_eq!(record.duration, Some(1_000));
        assert_eq!(record.total_tokens, Some(15));
        assert_eq!(record.status, CallStatus::Completed);
    }

    #[test]
    fn test_finalize_llm_derives_total_tokens() {
        let record = LlmCallMetrics::new("l1", "model-x", "p1", 0);
        let outcome = LlmOutcome {
            status: CallStatus::Completed,
            error: None,
            input_tokens: Some(7),
            output_tokens: Some(3),
            total_tokens: None,
            response_text: None,
        };
        let record = finalize_llm(record, outcome, 1).unwrap();
        assert_eq!(record.total_tokens, Some(10));
    }

    #[test]
    fn test_approval_closes_when_scheduled() {
        let (record, _) =
            apply_tool_status(tool(0), ToolCallStatus::AwaitingApproval, None, 0).unwrap();
        let (record, transition) =
            apply_tool_status(record, ToolCallStatus::Scheduled, None, 500).unwrap();

        assert_eq!(record.awaiting_approval_end_time, Some(500));
        assert_eq!(record.awaiting_approval_duration, Some(500));
        assert_eq!(
            transition,
            Some(ConfirmationTransition {
                confirmation_type: ConfirmationType::ApprovalGranted,
                waiting_duration: Some(500),
            })
        );

        // Moving on to executing does not grant a second time
        let (record, transition) =
            apply_tool_status(record, ToolCallStatus::Executing, Some(520), 520).unwrap();
        assert!(transition.is_none());
        assert_eq!(record.awaiting_approval_duration, Some(500));
        assert_eq!(record.execution_start_time, Some(520));

        let record = finalize_tool(record, completed(), 800).unwrap();
        assert_eq!(record.duration, Some(800));
        assert_eq!(record.pure_execution_duration, Some(300));
    }

    #[test]
    fn test_cancelled_while_awaiting_approval_closes_wait() {
        let (record, _) =
            apply_tool_status(tool(0), ToolCallStatus::AwaitingApproval, None, 100).unwrap();
        let outcome = ToolOutcome {
            status: ToolCallStatus::Cancelled,
            ..completed()
        };
        let record = finalize_tool(record, outcome, 400).unwrap();

        assert_eq!(record.awaiting_approval_end_time, Some(400));
        assert_eq!(record.awaiting_approval_duration, Some(300));
        assert_eq!(record.pure_execution_duration, Some(100));
    }

    #[test]
    fn test_extreme_execution_start_saturates() {
        let (record, _) =
            apply_tool_status(tool(0), ToolCallStatus::Executing, Some(i64::MIN), 10).unwrap();
        let record = finalize_tool(record, completed(), 20).unwrap();

        assert_eq!(record.execution_duration, Some(i64::MAX));
        assert_eq!(record.duration, Some(20));
    }

    #[test]
    fn test_extreme_start_time_saturates() {
        let mut record = tool(i64::MIN);
        record.awaiting_approval_duration = Some(i64::MIN);
        let record = finalize_tool(record, completed(), i64::MAX).unwrap();

        assert_eq!(record.duration, Some(i64::MAX));
        assert_eq!(record.pure_execution_duration, Some(i64::MAX));

        let llm = LlmCallMetrics::new("l1", "model-x", "p1", i64::MIN);
        let outcome = LlmOutcome {
            status: CallStatus::Completed,
            error: None,
            input_tokens: None,
            output_tokens: None,
            total_tokens: None,
            response_text: None,
        };
        let llm = finalize_llm(llm, outcome, 1).unwrap();
        assert_eq!(llm.duration, Some(i64::MAX));
    }

    #[test]
    fn test_derived_total_tokens_saturate() {
        let record = LlmCallMetrics::new("l1", "model-x", "p1", 0);
        let outcome = LlmOutcome {
            status: CallStatus::Completed,
            error: None,
            input_tokens: Some(u64::MAX),
            output_tokens: Some(1),
            total_tokens: None,
            response_text: None,
        };
        let record = finalize_llm(record, outcome, 1).unwrap();
        assert_eq!(record.total_tokens, Some(u64::MAX));
    }

    #[test]
    fn test_finalize_embedding() {
        let record = EmbeddingCallMetrics::new("e1", "embed-1", "p1", 4, 10);
        let outcome = EmbeddingOutcome {
            status: CallStatus::Completed,
            error: None,
            vector_dimensions: Some(768),
        };
        let record = finalize_embedding(record, outcome.clone(), 60).unwrap();

        assert_eq!(record.duration, Some(50));
        assert_eq!(record.vector_dimensions, Some(768));
        assert!(finalize_embedding(record, outcome, 70).is_none());
    }
}
