//! Shared status counters.
//!
//! The counter maps are shared between the message path and the status
//! reporter, serialized by one mutex. The mutex is never held across
//! I/O: increments copy small integers, snapshots clone the maps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use streamgrid_types::CounterStatuses;

#[derive(Default)]
struct Counters {
    source_statuses: CounterStatuses,
    sink_statuses: CounterStatuses,
}

/// Sidecar-owned counter maps destined for the step status.
#[derive(Default)]
pub struct SharedStatus {
    counters: Mutex<Counters>,
    dirty: AtomicBool,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_sink_total(&self, name: &str, replica: u32, bytes: u64) {
        self.counters
            .lock()
            .expect("status lock")
            .sink_statuses
            .incr_total(name, replica, bytes);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn incr_sink_errors(&self, name: &str, replica: u32) {
        self.counters
            .lock()
            .expect("status lock")
            .sink_statuses
            .incr_errors(name, replica);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn incr_source_total(&self, name: &str, replica: u32, bytes: u64) {
        self.counters
            .lock()
            .expect("status lock")
            .source_statuses
            .incr_total(name, replica, bytes);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn incr_source_errors(&self, name: &str, replica: u32) {
        self.counters
            .lock()
            .expect("status lock")
            .source_statuses
            .incr_errors(name, replica);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Snapshot of (source, sink) counter maps.
    pub fn snapshot(&self) -> (CounterStatuses, CounterStatuses) {
        let counters = self.counters.lock().expect("status lock");
        (
            counters.source_statuses.clone(),
            counters.sink_statuses.clone(),
        )
    }

    /// Snapshot only if something changed since the last snapshot.
    pub fn snapshot_if_dirty(&self) -> Option<(CounterStatuses, CounterStatuses)> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            Some(self.snapshot())
        } else {
            None
        }
    }
}
