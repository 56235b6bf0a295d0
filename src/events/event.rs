//! # Runtime events emitted by the queue, the gate, and the watcher.
//!
//! [`EventKind`] classifies events across three areas:
//! - **Queue lifecycle**: start/stop and per-task execution outcomes.
//! - **Gate activity**: requests parking, releasing, and hitting limits.
//! - **Shutdown**: the fail-fast path requested by a task failure.
//!
//! [`Event`] carries optional metadata (task name, waiter id, queue counters,
//! failure reason) set per kind.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when delivery interleaves.
//!
//! ## Example
//! ```rust
//! use draingate::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::TaskFailed)
//!     .with_task("warmup")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("warmup"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Queue lifecycle ===
    /// Queue began dispatching buffered tasks.
    ///
    /// Sets: `pending`, `at`, `seq`
    QueueStarted,

    /// Queue stopped; backlog dropped, snapshots read idle from here on.
    ///
    /// Sets: `pending` (dropped backlog size), `at`, `seq`
    QueueStopped,

    /// Task execution is starting.
    ///
    /// Sets: `task`, `at`, `seq`
    TaskStarting,

    /// Task finished successfully or exited on cancellation.
    ///
    /// Sets: `task`, `at`, `seq`
    TaskStopped,

    /// Task failed; the watcher will trip the shutdown path.
    ///
    /// Sets: `task`, `reason`, `at`, `seq`
    TaskFailed,

    /// Task exceeded its execution deadline (always followed by `TaskFailed`).
    ///
    /// Sets: `task`, `timeout_ms`, `at`, `seq`
    TimeoutHit,

    // === Gate activity ===
    /// Request parked behind a non-idle queue.
    ///
    /// Sets: `waiter`, `pending`, `active`, `at`, `seq`
    WaiterParked,

    /// Parked request released (queue drained or a limit fired).
    ///
    /// Sets: `waiter`, `waited_ms`, `at`, `seq`
    WaiterReleased,

    /// A parked request tripped the waiter cap or its wait budget.
    ///
    /// Sets: `waiter`, `reason` (`"waiter_cap"` / `"wait_budget"`),
    /// `waited_ms`, `at`, `seq`
    LimitReached,

    // === Shutdown ===
    /// A task failure requested the host shutdown sequence.
    ///
    /// Sets: `task`, `reason`, `at`, `seq`
    ShutdownRequested,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Waiter identifier, if applicable.
    pub waiter: Option<u64>,
    /// Human-readable reason (failure message, limit cause).
    pub reason: Option<Arc<str>>,
    /// Task deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Time the waiter spent parked, in milliseconds (compact).
    pub waited_ms: Option<u32>,
    /// Pending task count at emission time.
    pub pending: Option<usize>,
    /// Active task count at emission time.
    pub active: Option<usize>,
}

impl Event {
    /// Creates an event of the given kind stamped with the current time and
    /// the next global sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            waiter: None,
            reason: None,
            timeout_ms: None,
            waited_ms: None,
            pending: None,
            active: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a waiter identifier.
    #[inline]
    pub fn with_waiter(mut self, id: u64) -> Self {
        self.waiter = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a parked duration (stored as milliseconds).
    #[inline]
    pub fn with_waited(mut self, d: Duration) -> Self {
        self.waited_ms = Some(compact_ms(d));
        self
    }

    /// Attaches queue counters.
    #[inline]
    pub fn with_counts(mut self, pending: usize, active: usize) -> Self {
        self.pending = Some(pending);
        self.active = Some(active);
        self
    }
}

#[inline]
fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
