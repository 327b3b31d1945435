//! WorkQueue — per-key single-flight delivery for the control loop.
//!
//! Keys added while queued are deduplicated; keys added while being
//! processed are marked dirty and re-queued when processing finishes.
//! Together with one worker calling `next`/`done` per key, this gives
//! at-least-once delivery with at most one in-flight reconcile per key.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use streamgrid_types::StepKey;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<StepKey>,
    dirty: HashSet<StepKey>,
    processing: HashSet<StepKey>,
}

/// Deduplicating work queue of step keys.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a key. No-op if the key is already queued; if the key is
    /// currently being processed it is re-queued once `done` is called.
    pub fn add(&self, key: StepKey) {
        let mut state = self.state.lock().expect("workqueue lock");
        if !state.dirty.insert(key.clone()) {
            return;
        }
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Enqueue a key after a delay.
    pub fn add_after(self: Arc<Self>, key: StepKey, delay: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.add(key);
        });
    }

    /// Wait for the next key and mark it as being processed.
    pub async fn next(&self) -> StepKey {
        loop {
            let notified = self.notify.notified();
            if let Some(key) = self.try_next() {
                return key;
            }
            notified.await;
        }
    }

    fn try_next(&self) -> Option<StepKey> {
        let mut state = self.state.lock().expect("workqueue lock");
        let key = state.queue.pop_front()?;
        state.dirty.remove(&key);
        state.processing.insert(key.clone());
        Some(key)
    }

    /// Mark processing of a key as finished. If the key went dirty while
    /// in flight it is re-queued immediately.
    pub fn done(&self, key: &StepKey) {
        let mut state = self.state.lock().expect("workqueue lock");
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Number of keys waiting (not counting in-flight ones).
    pub fn len(&self) -> usize {
        self.state.lock().expect("workqueue lock").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
