//! Aggregate reporting over emitted events.
//!
//! [`MonitorSummary`] folds a sequence of [`MonitoringEvent`]s into per-kind counts,
//! latency statistics, token totals and approval-wait statistics. It works the same on
//! the recorder's in-memory buffer and on events read back from a trace file.

use super::metrics::{CallKind, MonitoringEvent};
use serde::Serialize;
use std::collections::BTreeMap;

/// Running min/max/total over millisecond durations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub total: i64,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl DurationStats {
    pub fn record(&mut self, ms: i64) {
        self.count += 1;
        self.total = self.total.saturating_add(ms);
        self.min = Some(self.min.map_or(ms, |min| min.min(ms)));
        self.max = Some(self.max.map_or(ms, |max| max.max(ms)));
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total as f64 / self.count as f64)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LlmSummary {
    pub calls: usize,
    pub completed: usize,
    pub errors: usize,
    pub durations: DurationStats,
    pub total_tokens: u64,
    pub by_model: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolSummary {
    pub calls: usize,
    pub completed: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub durations: DurationStats,
    pub pure_execution: DurationStats,
    pub by_tool: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApprovalSummary {
    pub requested: usize,
    pub granted: usize,
    /// Approval waits taken from finished tool calls
    pub waits: DurationStats,
    pub waits_by_tool: BTreeMap<String, DurationStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbeddingSummary {
    pub calls: usize,
    pub completed: usize,
    pub errors: usize,
    pub total_texts: u64,
    pub durations: DurationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorSummary {
    pub total_events: usize,
    /// Counts keyed by `type.event`, e.g. `tool_call.completed`
    pub event_counts: BTreeMap<String, usize>,
    pub llm: LlmSummary,
    pub tools: ToolSummary,
    pub approvals: ApprovalSummary,
    pub embeddings: EmbeddingSummary,
}

impl MonitorSummary {
    pub fn from_events(events: &[MonitoringEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            summary.add(event);
        }
        summary
    }

    fn add(&mut self, event: &MonitoringEvent) {
        self.total_events += 1;
        *self
            .event_counts
            .entry(format!("{}.{}", event.kind, event.event))
            .or_insert(0) += 1;

        match event.kind {
            CallKind::LlmCall => {
                let llm = &mut self.llm;
                llm.calls += 1;
                match event.event.as_str() {
                    "completed" => llm.completed += 1,
                    "error" => llm.errors += 1,
                    _ => {}
                }
                if let Some(duration) = event.data_i64("duration") {
                    llm.durations.record(duration);
                }
                if let Some(tokens) = event.data.get("totalTokens").and_then(|v| v.as_u64()) {
                    llm.total_tokens = llm.total_tokens.saturating_add(tokens);
                }
                let model = event.data_str("model").unwrap_or("unknown");
                *llm.by_model.entry(model.to_string()).or_insert(0) += 1;
            }
            CallKind::ToolCall => {
                let tools = &mut self.tools;
                tools.calls += 1;
                match event.event.as_str() {
                    "completed" => tools.completed += 1,
                    "error" => tools.errors += 1,
                    "cancelled" => tools.cancelled += 1,
                    _ => {}
                }
                if let Some(duration) = event.data_i64("duration") {
                    tools.durations.record(duration);
                }
                if let Some(pure) = event.data_i64("pureExecutionDuration") {
                    tools.pure_execution.record(pure);
                }
                let tool_name = event.data_str("toolName").unwrap_or("unknown");
                *tools.by_tool.entry(tool_name.to_string()).or_insert(0) += 1;

                if let Some(waited) = event.data_i64("awaitingApprovalDuration") {
                    self.approvals.waits.record(waited);
                    self.approvals
                        .waits_by_tool
                        .entry(tool_name.to_string())
                        .or_default()
                        .record(waited);
                }
            }
            CallKind::EmbeddingCall => {
                let embeddings = &mut self.embeddings;
                embeddings.calls += 1;
                match event.event.as_str() {
                    "completed" => embeddings.completed += 1,
                    "error" => embeddings.errors += 1,
                    _ => {}
                }
                if let Some(duration) = event.data_i64("duration") {
                    embeddings.durations.record(duration);
                }
                if let Some(count) = event.data.get("textCount").and_then(|v| v.as_u64()) {
                    embeddings.total_texts = embeddings.total_texts.saturating_add(count);
                }
            }
            CallKind::UserConfirmation => match event.event.as_str() {
                "approval_requested" => self.approvals.requested += 1,
                "approval_granted" => self.approvals.granted += 1,
                _ => {}
            },
        }
    }

    /// Format as a human-readable report
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Call Monitor Summary ===\n\n");
        report.push_str(&format!("Events: {}\n", self.total_events));
        for (key, count) in &self.event_counts {
            report.push_str(&format!("  {}: {}\n", key, count));
        }
        report.push('\n');

        if self.llm.calls > 0 {
            report.push_str(&format!(
                "LLM calls: {} ({} completed, {} failed)\n",
                self.llm.calls, self.llm.completed, self.llm.errors
            ));
            push_durations(&mut report, "response time", &self.llm.durations);
            report.push_str(&format!("  tokens: {}\n", self.llm.total_tokens));
            for (model, count) in &self.llm.by_model {
                report.push_str(&format!("  {}: {} calls\n", model, count));
            }
            report.push('\n');
        }

        if self.tools.calls > 0 {
            report.push_str(&format!(
                "Tool calls: {} ({} completed, {} failed, {} cancelled)\n",
                self.tools.calls, self.tools.completed, self.tools.errors, self.tools.cancelled
            ));
            push_durations(&mut report, "duration", &self.tools.durations);
            push_durations(&mut report, "pure execution", &self.tools.pure_execution);
            for (tool, count) in &self.tools.by_tool {
                report.push_str(&format!("  {}: {} calls\n", tool, count));
            }
            report.push('\n');
        }

        if self.approvals.requested > 0 || self.approvals.waits.count > 0 {
            report.push_str(&format!(
                "Approvals: {} requested, {} granted\n",
                self.approvals.requested, self.approvals.granted
            ));
            push_durations(&mut report, "wait", &self.approvals.waits);
            report.push_str(&format!("  total wait: {}ms\n", self.approvals.waits.total));
            for (tool, waits) in &self.approvals.waits_by_tool {
                if let Some(avg) = waits.average() {
                    report.push_str(&format!(
                        "  {}: avg {:.0}ms ({} waits)\n",
                        tool, avg, waits.count
                    ));
                }
            }
            report.push('\n');
        }

        if self.embeddings.calls > 0 {
            report.push_str(&format!(
                "Embedding calls: {} ({} completed, {} failed), {} texts\n",
                self.embeddings.calls,
                self.embeddings.completed,
                self.embeddings.errors,
                self.embeddings.total_texts
            ));
            push_durations(&mut report, "duration", &self.embeddings.durations);
        }

        report
    }
}

fn push_durations(report: &mut String, label: &str, stats: &DurationStats) {
    if let (Some(avg), Some(min), Some(max)) = (stats.average(), stats.min, stats.max) {
        report.push_str(&format!(
            "  {}: avg {:.0}ms, min {}ms, max {}ms\n",
            label, avg, min, max
        ));
    }
}
