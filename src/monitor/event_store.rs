//! In-memory buffer of emitted monitoring events
//!
//! The recorder keeps a copy of every event it emits so surrounding tooling can query
//! the run without re-reading the trace file. The buffer is bounded; once full, the
//! oldest events are dropped.

use super::metrics::{CallKind, MonitoringEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Type alias for event callback functions
pub type EventCallback = Arc<dyn Fn(&MonitoringEvent) + Send + Sync>;

/// Thread-safe, bounded store of [`MonitoringEvent`]s
///
/// Supports:
/// - Callbacks triggered on each stored event
/// - Filtering by call kind
/// - Filtering by time range (epoch milliseconds)
/// - Custom filter predicates
/// - Query for last N events
pub struct EventStore {
    events: Mutex<VecDeque<MonitoringEvent>>,
    capacity: usize,
    on_store_callback: Option<EventCallback>,
}

impl EventStore {
    /// Create a new event store
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events retained
    /// * `on_store_callback` - Optional callback function called whenever an event is stored
    pub fn new(capacity: usize, on_store_callback: Option<EventCallback>) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
            on_store_callback,
        }
    }

    /// Attach a callback run for every stored event
    pub fn with_callback(mut self, callback: EventCallback) -> Self {
        self.on_store_callback = Some(callback);
        self
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<MonitoringEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store an event, evicting the oldest one if the store is full
    pub fn store(&self, event: MonitoringEvent) {
        if let Some(callback) = &self.on_store_callback {
            callback(&event);
        }

        if self.capacity == 0 {
            return;
        }

        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Copies of all stored events, oldest first
    pub fn events(&self) -> Vec<MonitoringEvent> {
        self.lock().iter().cloned().collect()
    }

    /// Get events matching filters
    ///
    /// # Arguments
    ///
    /// * `kind` - Only include events of this call kind
    /// * `start_time` - Include events with timestamp >= start_time (epoch ms)
    /// * `end_time` - Include events with timestamp <= end_time (epoch ms)
    /// * `filter_func` - Custom filter function to apply to events
    pub fn get_events(
        &self,
        kind: Option<CallKind>,
        start_time: Option<i64>,
        end_time: Option<i64>,
        filter_func: Option<&dyn Fn(&MonitoringEvent) -> bool>,
    ) -> Vec<MonitoringEvent> {
        self.lock()
            .iter()
            .filter(|event| matches(event, kind, start_time, end_time, filter_func))
            .cloned()
            .collect()
    }

    /// Count events matching filters
    pub fn count_events(
        &self,
        kind: Option<CallKind>,
        start_time: Option<i64>,
        end_time: Option<i64>,
        filter_func: Option<&dyn Fn(&MonitoringEvent) -> bool>,
    ) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches(event, kind, start_time, end_time, filter_func))
            .count()
    }

    /// Get the last N events, optionally filtered
    pub fn get_last_n(
        &self,
        n: usize,
        filter_func: Option<&dyn Fn(&MonitoringEvent) -> bool>,
    ) -> Vec<MonitoringEvent> {
        let events = self.lock();

        let filtered: Vec<_> = if let Some(filter) = filter_func {
            events.iter().filter(|e| filter(e)).collect()
        } else {
            events.iter().collect()
        };

        let start_idx = filtered.len().saturating_sub(n);
        filtered[start_idx..].iter().map(|e| (*e).clone()).collect()
    }

    /// Clear all events from the store
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get the total number of events in the store
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the event store is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_EVENTS, None)
    }
}

fn matches(
    event: &MonitoringEvent,
    kind: Option<CallKind>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    filter_func: Option<&dyn Fn(&MonitoringEvent) -> bool>,
) -> bool {
    if let Some(kind) = kind {
        if event.kind != kind {
            return false;
        }
    }

    if start_time.is_some() || end_time.is_some() {
        let Some(ts) = event.timestamp_ms() else {
            return false;
        };
        if start_time.is_some_and(|start| ts < start) {
            return false;
        }
        if end_time.is_some_and(|end| ts > end) {
            return false;
        }
    }

    filter_func.map_or(true, |filter| filter(event))
}
