//! Persistent analytics event queue
//!
//! The queue is mirrored to the durable store after every mutation. Each
//! mutate-and-persist sequence runs under one lock so the snapshot on disk
//! always matches a state the queue actually held.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use intelligence_domain::constants::KEY_EVENT_QUEUE_SNAPSHOT;
use intelligence_domain::QueuedEvent;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::storage::DurableStore;

/// FIFO of enriched events awaiting delivery.
pub struct EventQueue {
    store: Arc<dyn DurableStore>,
    events: Mutex<VecDeque<QueuedEvent>>,
    flush_scheduled: AtomicBool,
}

impl EventQueue {
    /// Reload the persisted snapshot; records that no longer parse are dropped.
    pub fn load(store: Arc<dyn DurableStore>) -> Self {
        let events = read_snapshot(store.as_ref());
        if !events.is_empty() {
            info!(count = events.len(), "Reloaded queued analytics events");
        }
        Self { store, events: Mutex::new(events), flush_scheduled: AtomicBool::new(false) }
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Copy of the queued events, head first.
    pub fn snapshot(&self) -> Vec<QueuedEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Append `event` and persist.
    pub fn push(&self, event: QueuedEvent) {
        let mut events = self.events.lock();
        events.push_back(event);
        self.persist(&events);
    }

    /// Drop every event past the retention window, then persist the result.
    /// Returns how many events were dropped.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|event| !event.is_expired(now));
        let purged = before - events.len();
        self.persist(&events);
        if purged > 0 {
            debug!(purged, "Dropped expired analytics events");
        }
        purged
    }

    /// Up to `max` events from the head.
    pub fn head(&self, max: usize) -> Vec<QueuedEvent> {
        self.events.lock().iter().take(max).cloned().collect()
    }

    /// Remove up to `count` events from the head and persist.
    pub fn remove_head(&self, count: usize) -> usize {
        let mut events = self.events.lock();
        let removed = count.min(events.len());
        events.drain(..removed);
        self.persist(&events);
        removed
    }

    /// Claim the flush-scheduled flag; `true` if this caller set it.
    pub(crate) fn try_mark_flush_scheduled(&self) -> bool {
        !self.flush_scheduled.swap(true, Ordering::SeqCst)
    }

    /// Release the flag when a flush starts running.
    pub(crate) fn clear_flush_scheduled(&self) {
        self.flush_scheduled.store(false, Ordering::SeqCst);
    }

    fn persist(&self, events: &VecDeque<QueuedEvent>) {
        let json = match serde_json::to_string(events) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize analytics queue");
                return;
            }
        };
        if let Err(e) = self.store.set(KEY_EVENT_QUEUE_SNAPSHOT, &json, true) {
            warn!(error = %e, "Failed to persist analytics queue");
        }
    }
}

fn read_snapshot(store: &dyn DurableStore) -> VecDeque<QueuedEvent> {
    let Some(raw) = store.get(KEY_EVENT_QUEUE_SNAPSHOT) else {
        return VecDeque::new();
    };

    let records: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Discarding unreadable analytics queue snapshot");
            return VecDeque::new();
        }
    };

    let total = records.len();
    let events: VecDeque<QueuedEvent> =
        records.into_iter().filter_map(|record| serde_json::from_value(record).ok()).collect();
    if events.len() < total {
        warn!(dropped = total - events.len(), "Dropped malformed analytics records");
    }
    events
}
