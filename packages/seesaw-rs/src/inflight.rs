//! Inflight tracking per correlation ID.
//!
//! Every envelope is counted from the moment it is enqueued until the runtime
//! has finished dispatching it, emitted whatever its subscribers returned, and
//! run the taps. Children are counted *before* the parent is released, so the
//! count for a correlation only reaches zero once the whole cascade settled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::warn;

use crate::core::CorrelationId;

struct InflightEntry {
    count: AtomicUsize,
    waiters: AtomicUsize,
    notify: Notify,
    first_error: Mutex<Option<anyhow::Error>>,
}

impl InflightEntry {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            waiters: AtomicUsize::new(0),
            notify: Notify::new(),
            first_error: Mutex::new(None),
        }
    }

    fn has_error(&self) -> bool {
        // Poisoned = treat as error so it is not silently dropped
        self.first_error
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(true)
    }

    fn take_error(&self) -> Option<anyhow::Error> {
        match self.first_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Keeps an entry alive while someone awaits it.
pub struct WaiterGuard {
    entry: Arc<InflightEntry>,
}

impl WaiterGuard {
    fn new(entry: Arc<InflightEntry>) -> Self {
        entry.waiters.fetch_add(1, Ordering::AcqRel);
        Self { entry }
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.entry.waiters.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Tracks pending work per correlation ID.
#[derive(Default)]
pub struct InflightTracker {
    entries: DashMap<CorrelationId, Arc<InflightEntry>>,
}

impl InflightTracker {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn get_or_create(&self, cid: CorrelationId) -> Arc<InflightEntry> {
        self.entries
            .entry(cid)
            .or_insert_with(|| Arc::new(InflightEntry::new()))
            .clone()
    }

    /// Count `n` more pending items for `cid`.
    pub fn inc(&self, cid: CorrelationId, n: usize) {
        self.get_or_create(cid).count.fetch_add(n, Ordering::AcqRel);
    }

    /// Release `n` pending items for `cid`, waking waiters at zero.
    ///
    /// At zero the entry is dropped unless an error is held for a waiter.
    pub fn dec(&self, cid: CorrelationId, n: usize) {
        let Some(entry) = self.entries.get(&cid).map(|e| e.clone()) else {
            return;
        };

        let prev = entry.count.fetch_sub(n, Ordering::AcqRel);
        if prev != n {
            return;
        }

        entry.notify.notify_waiters();

        let has_waiters = entry.waiters.load(Ordering::Acquire) > 0;
        if !entry.has_error() || !has_waiters {
            self.entries.remove(&cid);
        }
    }

    /// Record the first error seen for `cid`; later errors are dropped.
    pub fn record_error(&self, cid: CorrelationId, err: anyhow::Error) {
        let Some(entry) = self.entries.get(&cid).map(|e| e.clone()) else {
            return;
        };

        let mut guard = match entry.first_error.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!(cid = %cid, "inflight error slot was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if guard.is_none() {
            *guard = Some(err);
        }
    }

    /// Register interest in `cid` before emitting, so a fast cascade
    /// cannot settle and discard its error before `wait_zero` looks.
    pub fn register_waiter(&self, cid: CorrelationId) -> WaiterGuard {
        WaiterGuard::new(self.get_or_create(cid))
    }

    /// Wait until nothing is pending for `cid`.
    ///
    /// Returns the first recorded error, if any.
    pub async fn wait_zero(&self, cid: CorrelationId) -> Result<()> {
        loop {
            let entry = match self.entries.get(&cid) {
                None => return Ok(()),
                Some(entry) => entry.clone(),
            };

            // Register before checking to avoid missing a notify_waiters()
            let notified = entry.notify.notified();

            if entry.count.load(Ordering::Acquire) == 0 {
                let err = entry.take_error();
                self.entries.remove(&cid);
                return match err {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
            }

            notified.await;
        }
    }

    /// Drop the entry for `cid` after a waiter gave up on it.
    pub(crate) fn forget(&self, cid: CorrelationId) {
        self.entries.remove(&cid);
    }

    pub fn has_pending_work(&self, cid: CorrelationId) -> bool {
        self.entries
            .get(&cid)
            .map(|e| e.count.load(Ordering::Acquire) > 0)
            .unwrap_or(false)
    }

    /// Number of correlations with a live entry.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for InflightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflightTracker")
            .field("active_correlations", &self.entries.len())
            .finish()
    }
}

/// Releases one pending item on drop, even if handling panicked.
pub(crate) struct InflightGuard {
    tracker: Arc<InflightTracker>,
    cid: CorrelationId,
}

impl InflightGuard {
    /// The caller already counted this item (via emit).
    pub(crate) fn for_event(tracker: Arc<InflightTracker>, cid: CorrelationId) -> Self {
        Self { tracker, cid }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.tracker.dec(self.cid, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_zero_without_entry_is_ok() {
        let tracker = InflightTracker::new();
        tracker.wait_zero(CorrelationId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_zero_wakes_when_count_drops() {
        let tracker = Arc::new(InflightTracker::new());
        let cid = CorrelationId::new();
        let _waiter = tracker.register_waiter(cid);
        tracker.inc(cid, 2);

        let t = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            t.dec(cid, 1);
            t.dec(cid, 1);
        });

        tokio::time::timeout(Duration::from_secs(1), tracker.wait_zero(cid))
            .await
            .expect("should settle")
            .unwrap();
        assert!(!tracker.has_pending_work(cid));
    }

    #[tokio::test]
    async fn test_error_is_kept_for_waiter() {
        let tracker = InflightTracker::new();
        let cid = CorrelationId::new();
        let _waiter = tracker.register_waiter(cid);
        tracker.inc(cid, 1);
        tracker.record_error(cid, anyhow::anyhow!("first"));
        tracker.record_error(cid, anyhow::anyhow!("second"));
        tracker.dec(cid, 1);

        let err = tracker.wait_zero(cid).await.unwrap_err();
        assert_eq!(err.to_string(), "first");
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_error_without_waiter_is_discarded() {
        let tracker = InflightTracker::new();
        let cid = CorrelationId::new();
        tracker.inc(cid, 1);
        tracker.record_error(cid, anyhow::anyhow!("nobody listens"));
        tracker.dec(cid, 1);
        assert_eq!(tracker.active_count(), 0);
    }
}
