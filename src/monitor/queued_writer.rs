//! Bounded background writer for high call volumes.
//!
//! [`QueuedTraceWriter`] accepts events synchronously into a bounded in-process queue
//! and drains it into an inner [`TraceSink`] from a tokio task, so the monitored
//! workflow never waits on storage. When the queue is full the oldest pending event is
//! dropped and counted.

use super::metrics::MonitoringEvent;
use super::trace_writer::TraceSink;
use crate::error::{MonitorError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Queue = Arc<Mutex<VecDeque<MonitoringEvent>>>;

/// Queueing front for another sink.
///
/// ```ignore
/// use calltrace::monitor::{FileTraceWriter, QueuedTraceWriter, Recorder};
///
/// let queued = Arc::new(QueuedTraceWriter::new(
///     Arc::new(FileTraceWriter::new("trace.jsonl")),
///     4096,
/// ));
/// queued.start()?;
/// let recorder = Recorder::with_sink(config, queued.clone());
/// // ... run the workflow ...
/// queued.stop().await?;
/// ```
pub struct QueuedTraceWriter {
    inner: Arc<dyn TraceSink>,
    queue: Queue,
    capacity: usize,
    dropped: Arc<AtomicU64>,
    stop_flag: Arc<AtomicBool>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
}

impl QueuedTraceWriter {
    /// Create a writer holding at most `capacity` pending events
    pub fn new(inner: Arc<dyn TraceSink>, capacity: usize) -> Self {
        Self {
            inner,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
            dropped: Arc::new(AtomicU64::new(0)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            task_handle: Mutex::new(None),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Set how often the background task checks for new events
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Spawn the drain task. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut handle_slot = lock(&self.task_handle);
        if handle_slot.is_some() {
            return Err(MonitorError::WriterError("Writer already started".to_string()));
        }

        debug!("Starting queued trace writer");
        self.stop_flag.store(false, Ordering::SeqCst);

        let inner = self.inner.clone();
        let queue = self.queue.clone();
        let stop_flag = self.stop_flag.clone();
        let interval = self.poll_interval;

        *handle_slot = Some(tokio::spawn(async move {
            Self::drain_loop(inner, queue, stop_flag, interval).await;
        }));
        info!("Queued trace writer started");

        Ok(())
    }

    /// Stop the drain task after it has written everything still queued.
    pub async fn stop(&self) -> Result<()> {
        let handle = lock(&self.task_handle).take();
        if let Some(handle) = handle {
            debug!("Stopping queued trace writer");
            self.stop_flag.store(true, Ordering::SeqCst);
            handle.await.map_err(|e| {
                MonitorError::WriterError(format!("Failed to stop writer: {}", e))
            })?;
            info!("Queued trace writer stopped");
        }
        Ok(())
    }

    /// Wait until the queue is empty or `timeout` elapses. Returns whether it emptied.
    pub async fn wait_for_empty_queue(&self, timeout: Option<Duration>) -> bool {
        let start = tokio::time::Instant::now();
        loop {
            if self.queue_len() == 0 {
                return true;
            }
            if let Some(timeout) = timeout {
                if start.elapsed() > timeout {
                    return false;
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub fn queue_len(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Events discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    async fn drain_loop(
        inner: Arc<dyn TraceSink>,
        queue: Queue,
        stop_flag: Arc<AtomicBool>,
        interval: Duration,
    ) {
        loop {
            // Read the flag before draining so nothing queued ahead of stop() is lost
            let stopping = stop_flag.load(Ordering::SeqCst);
            let batch: Vec<MonitoringEvent> = lock(&queue).drain(..).collect();

            if !batch.is_empty() {
                let sink = inner.clone();
                let written = tokio::task::spawn_blocking(move || {
                    for event in &batch {
                        if let Err(e) = sink.append(event) {
                            warn!(error = %e, event = %event.event, "Failed to append trace event");
                        }
                    }
                })
                .await;
                if let Err(e) = written {
                    warn!(error = %e, "Trace writer batch panicked");
                }
            }

            if stopping {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        debug!("Drain loop exiting");
    }
}

impl TraceSink for QueuedTraceWriter {
    fn append(&self, event: &MonitoringEvent) -> Result<()> {
        let mut queue = lock(&self.queue);
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event.clone());
        Ok(())
    }
}

impl Drop for QueuedTraceWriter {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::metrics::CallKind;
    use crate::monitor::trace_writer::MemoryTraceSink;
    use serde_json::json;

    fn event(id: &str) -> MonitoringEvent {
        MonitoringEvent {
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            kind: CallKind::LlmCall,
            event: "completed".to_string(),
            data: json!({ "id": id }),
        }
    }

    #[test]
    fn test_append_drops_oldest_when_full() {
        let sink = Arc::new(MemoryTraceSink::new());
        let writer = QueuedTraceWriter::new(sink, 2);

        writer.append(&event("a")).unwrap();
        writer.append(&event("b")).unwrap();
        writer.append(&event("c")).unwrap();

        assert_eq!(writer.queue_len(), 2);
        assert_eq!(writer.dropped(), 1);
        let pending: Vec<String> = lock(&writer.queue)
            .iter()
            .filter_map(|e| e.call_id().map(str::to_string))
            .collect();
        assert_eq!(pending, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_drains_into_inner_sink() {
        let sink = Arc::new(MemoryTraceSink::new());
        let writer = QueuedTraceWriter::new(sink.clone(), 16)
            .with_poll_interval(Duration::from_millis(5));
        writer.start().unwrap();

        writer.append(&event("a")).unwrap();
        writer.append(&event("b")).unwrap();

        assert!(writer.wait_for_empty_queue(Some(Duration::from_secs(5))).await);
        writer.stop().await.unwrap();

        let ids: Vec<String> = sink
            .events()
            .iter()
            .filter_map(|e| e.call_id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stop_flushes_pending_events() {
        let sink = Arc::new(MemoryTraceSink::new());
        let writer = QueuedTraceWriter::new(sink.clone(), 16)
            .with_poll_interval(Duration::from_secs(60));
        writer.start().unwrap();

        for i in 0..5 {
            writer.append(&event(&i.to_string())).unwrap();
        }
        writer.stop().await.unwrap();

        assert_eq!(sink.len(), 5);
        assert_eq!(writer.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_double_start_is_error() {
        let writer = QueuedTraceWriter::new(Arc::new(MemoryTraceSink::new()), 4);
        writer.start().unwrap();

        assert!(matches!(writer.start(), Err(MonitorError::WriterError(_))));
        writer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_is_ok() {
        let writer = QueuedTraceWriter::new(Arc::new(MemoryTraceSink::new()), 4);
        assert!(writer.stop().await.is_ok());
    }
}
