//! Simulated agent turn recorded through the call monitor
//!
//! Drives a recorder through one model call, a shell tool call that waits for user
//! approval, a second tool call that fails, and an embedding call. The trace lands in
//! `demo_trace.jsonl` via the queued writer, and the aggregate summary is printed at
//! the end.
//!
//! # Running the example
//!
//! ```bash
//! cargo run --example trace_demo
//! ```

use calltrace::logging::init_logging;
use calltrace::monitor::{
    read_trace, CallMonitor, CallStatus, FileTraceWriter, QueuedTraceWriter, Recorder,
    ToolCallStatus,
};
use calltrace::MonitorConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const TRACE_PATH: &str = "demo_trace.jsonl";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(Some("calltrace=debug"))?;

    let queued = Arc::new(QueuedTraceWriter::new(
        Arc::new(FileTraceWriter::new(TRACE_PATH)),
        1024,
    ));
    queued.start()?;

    let config = MonitorConfig::from_env()?.with_console_echo(true);
    let recorder = Arc::new(Recorder::with_sink(&config, queued.clone()));
    let monitor: Arc<dyn CallMonitor> = recorder.clone();

    let prompt_id = Uuid::new_v4().to_string();

    monitor.start_llm_call(
        "llm-1",
        "model-x",
        &prompt_id,
        Some(json!(r#"[{"role":"user","parts":[{"text":"list the files"}]}]"#)),
    );
    tokio::time::sleep(Duration::from_millis(120)).await;
    monitor.end_llm_call(
        "llm-1",
        CallStatus::Completed,
        None,
        Some(42),
        Some(17),
        None,
        Some(json!(r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"run_shell_command"}}]}}]}"#)),
    );

    monitor.start_tool_call("tool-1", "run_shell_command", "call-1", &prompt_id, json!({"command": "ls"}));
    monitor.update_tool_call_status("tool-1", ToolCallStatus::Validating, None);
    monitor.update_tool_call_status("tool-1", ToolCallStatus::AwaitingApproval, None);
    tokio::time::sleep(Duration::from_millis(300)).await;
    monitor.update_tool_call_status("tool-1", ToolCallStatus::Executing, None);
    tokio::time::sleep(Duration::from_millis(80)).await;
    monitor.end_tool_call(
        "tool-1",
        ToolCallStatus::Completed,
        None,
        Some(json!(r#"{"stdout":"Cargo.toml\nsrc\n","exitCode":0}"#)),
        Some("2 entries".to_string()),
        None,
    );

    monitor.start_tool_call("tool-2", "read_file", "call-2", &prompt_id, json!({"path": "missing.txt"}));
    monitor.update_tool_call_status("tool-2", ToolCallStatus::Executing, None);
    monitor.end_tool_call(
        "tool-2",
        ToolCallStatus::Error,
        Some("file not found".to_string()),
        None,
        None,
        None,
    );

    monitor.start_embedding_call("emb-1", "embed-1", &prompt_id, 2, Some(json!(["Cargo.toml", "src"])));
    tokio::time::sleep(Duration::from_millis(30)).await;
    monitor.end_embedding_call("emb-1", CallStatus::Completed, None, Some(768));

    queued.stop().await?;
    if queued.dropped() > 0 {
        println!("Dropped {} events", queued.dropped());
    }

    recorder.print_summary();

    let persisted = read_trace(TRACE_PATH)?;
    println!("{} lines in {}", persisted.len(), TRACE_PATH);

    Ok(())
}
