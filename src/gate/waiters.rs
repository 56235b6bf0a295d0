//! # Live-waiter bookkeeping.
//!
//! [`WaiterSet`] is the synchronized, ordered collection of currently-parked
//! requests, owned by the gate instance (never a module-level global). Its
//! only read is cardinality, tested against the waiter cap.
//!
//! ## Rules
//! - Insert/remove are the only mutations, and only the gate performs them.
//! - Removal happens **exactly once** per waiter on every exit path —
//!   [`WaiterGuard`] ties it to `Drop`, so a cancelled park future cannot
//!   leak its slot.
//! - The lock is held only for map insert/remove/len; never across an await.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;

/// Bookkeeping record for one parked request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Waiter {
    /// When the request parked; kept for diagnostics.
    #[allow(dead_code)]
    pub started_at: Instant,
}

/// Ordered, synchronized set of live waiters keyed by a monotonic id.
pub(crate) struct WaiterSet {
    inner: Mutex<BTreeMap<u64, Waiter>>,
    next_id: AtomicU64,
}

impl WaiterSet {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Registers a new waiter and returns the guard that owns its slot.
    pub(crate) fn park(self: &Arc<Self>, started_at: Instant) -> WaiterGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, Waiter { started_at });
        WaiterGuard {
            set: Arc::clone(self),
            id,
        }
    }

    /// Number of currently-parked requests.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Waiter>> {
        // Poisoning is unreachable: no panic occurs while holding this lock.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns one waiter's slot; dropping it removes the waiter from the set.
pub(crate) struct WaiterGuard {
    set: Arc<WaiterSet>,
    id: u64,
}

impl WaiterGuard {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_park_and_drop_maintain_cardinality() {
        let set = WaiterSet::new();
        assert!(set.is_empty());

        let a = set.park(Instant::now());
        let b = set.park(Instant::now());
        assert_eq!(set.len(), 2);
        assert_ne!(a.id(), b.id());

        drop(a);
        assert_eq!(set.len(), 1);
        drop(b);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let set = WaiterSet::new();
        let a = set.park(Instant::now());
        let b = set.park(Instant::now());
        let c = set.park(Instant::now());
        assert!(a.id() < b.id() && b.id() < c.id());
    }

    #[tokio::test]
    async fn test_guard_cleans_up_when_future_is_dropped() {
        let set = WaiterSet::new();

        let parked = {
            let set = Arc::clone(&set);
            tokio::spawn(async move {
                let _guard = set.park(Instant::now());
                // Parked forever; only cancellation releases the slot.
                std::future::pending::<()>().await;
            })
        };

        tokio::task::yield_now().await;
        assert_eq!(set.len(), 1);

        parked.abort();
        let _ = parked.await;
        assert!(set.is_empty(), "dropped future must not leak its waiter");
    }
}
