//! Per-kind registry of call records.
//!
//! A [`CallRegistry`] maps call ids to the current record for one call kind. Records are
//! never patched field by field: every mutation swaps in a whole new record while the
//! registry lock is held, so readers only ever see complete records.
//!
//! Finished calls stay queryable after their terminal event, bounded by a retention
//! limit. Once more than `max_finished` records have been finalized, the oldest
//! finalized ones are evicted. In-flight records are never evicted.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Records the registry can hold
pub trait CallRecord: Clone + Send {
    fn is_finalized(&self) -> bool;
}

impl CallRecord for super::metrics::LlmCallMetrics {
    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl CallRecord for super::metrics::ToolCallMetrics {
    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl CallRecord for super::metrics::EmbeddingCallMetrics {
    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

// Confirmation records are complete the moment they are created
impl CallRecord for super::metrics::UserConfirmationMetrics {
    fn is_finalized(&self) -> bool {
        true
    }
}

struct Slot<T> {
    record: T,
    /// Key into `Entries::order`
    registered: u64,
    /// Key of the live entry in `Entries::finished`, once finalized
    finished: Option<u64>,
}

struct Entries<T> {
    records: HashMap<String, Slot<T>>,
    /// Registration order, used for stable listing
    order: BTreeMap<u64, String>,
    /// Finalization order, oldest first. Entries whose sequence no longer matches the
    /// slot are stale and skipped.
    finished: VecDeque<(u64, String)>,
    /// Live (non-stale) entries in `finished`
    finished_count: usize,
    next_seq: u64,
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: BTreeMap::new(),
            finished: VecDeque::new(),
            finished_count: 0,
            next_seq: 0,
        }
    }
}

impl<T> Entries<T> {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn mark_finished(&mut self, id: &str) -> u64 {
        let seq = self.next_seq();
        self.finished.push_back((seq, id.to_string()));
        self.finished_count += 1;
        seq
    }

    fn is_live(&self, seq: u64, id: &str) -> bool {
        self.records
            .get(id)
            .map_or(false, |slot| slot.finished == Some(seq))
    }

    /// Drop stale entries once they outnumber live ones
    fn compact(&mut self) {
        if self.finished.len() > 2 * self.finished_count + 16 {
            let mut finished = std::mem::take(&mut self.finished);
            finished.retain(|(seq, id)| self.is_live(*seq, id));
            self.finished = finished;
        }
    }
}

pub struct CallRegistry<T: CallRecord> {
    entries: Mutex<Entries<T>>,
    max_finished: usize,
}

impl<T: CallRecord> CallRegistry<T> {
    pub fn new(max_finished: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_finished,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        // A panic elsewhere must not take telemetry down with it
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace the record for `id`
    pub fn put(&self, id: impl Into<String>, record: T) {
        let id = id.into();
        let mut entries = self.lock();

        let registered = match entries.records.remove(&id) {
            Some(previous) => {
                if previous.finished.is_some() {
                    entries.finished_count -= 1;
                }
                previous.registered
            }
            None => {
                let seq = entries.next_seq();
                entries.order.insert(seq, id.clone());
                seq
            }
        };

        let finished = if record.is_finalized() {
            Some(entries.mark_finished(&id))
        } else {
            None
        };
        entries.records.insert(
            id,
            Slot {
                record,
                registered,
                finished,
            },
        );
        self.evict(&mut entries);
    }

    /// Clone of the current record for `id`
    pub fn get(&self, id: &str) -> Option<T> {
        self.lock().records.get(id).map(|slot| slot.record.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().records.contains_key(id)
    }

    /// Clones of all records in registration order
    pub fn all(&self) -> Vec<T> {
        let entries = self.lock();
        entries
            .order
            .values()
            .filter_map(|id| entries.records.get(id).map(|slot| slot.record.clone()))
            .collect()
    }

    /// Atomically replace the record for `id` with the output of `f`.
    ///
    /// `f` receives a clone of the current record and returns the replacement plus a
    /// value handed back to the caller, or `None` to leave the record untouched. Returns
    /// `None` when `id` is unknown or `f` declined.
    pub fn replace_with<R, F>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(T) -> Option<(T, R)>,
    {
        let mut entries = self.lock();
        let (current, already_finished) = {
            let slot = entries.records.get(id)?;
            (slot.record.clone(), slot.finished.is_some())
        };

        let (replacement, output) = f(current)?;
        let newly_finished = replacement.is_finalized() && !already_finished;
        let finished_seq = if newly_finished {
            Some(entries.mark_finished(id))
        } else {
            None
        };

        if let Some(slot) = entries.records.get_mut(id) {
            slot.record = replacement;
            if finished_seq.is_some() {
                slot.finished = finished_seq;
            }
        }

        if newly_finished {
            self.evict(&mut entries);
        }
        Some(output)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.records.clear();
        entries.order.clear();
        entries.finished.clear();
        entries.finished_count = 0;
    }

    fn evict(&self, entries: &mut Entries<T>) {
        while entries.finished_count > self.max_finished {
            let Some((seq, id)) = entries.finished.pop_front() else {
                break;
            };
            if !entries.is_live(seq, &id) {
                continue;
            }
            if let Some(slot) = entries.records.remove(&id) {
                entries.order.remove(&slot.registered);
                entries.finished_count -= 1;
            }
        }
        entries.compact();
    }
}
