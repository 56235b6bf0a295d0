//! # AdmissionGate: park inbound requests until the queue drains or a limit fires.
//!
//! The gate sits at the earliest point of the request pipeline. The
//! steady-state path is two atomic loads: an idle queue lets the request
//! through without allocating anything.
//!
//! ## Park protocol
//! ```text
//! admit(request)
//!   ├─ snapshot idle ──► Admission::Proceed          (no waiter created)
//!   └─ busy ──► register waiter, poll every check_interval
//!        (first check runs immediately, not on the first timer tick)
//!        per tick, in order:
//!          a. queue idle                       ──► release, Proceed
//!          b. live > max_waiters  OR
//!             elapsed > max_wait               ──► release, run limit handler
//!          c. otherwise                        ──► keep waiting
//! ```
//!
//! ## Rules
//! - The waiter-count check uses strict `>`: exactly `max_waiters` requests
//!   may wait; the next one trips the limit. The count includes the waiter
//!   itself, which registers before its first check.
//! - Count is checked before duration on the same tick; under a simultaneous
//!   breach the handler observes the count path.
//! - Release (waiter removed, poll loop ended) happens exactly once on every
//!   exit path — including handler failure and a dropped request future —
//!   via the waiter guard.
//! - The handler runs **after** release, so a slow handler does not hold a
//!   waiter slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::events::{Bus, Event, EventKind};
use crate::gate::handler::{LimitCause, LimitContext, LimitHandler};
use crate::gate::response::{RequestInfo, Response};
use crate::gate::waiters::WaiterSet;
use crate::queue::TaskQueue;

/// Outcome of the per-request entry check.
#[derive(Debug)]
pub enum Admission {
    /// Queue is idle (or drained while parked); run the request normally.
    Proceed,
    /// A limit tripped; the limit handler produced this terminal response.
    Limited(Response),
}

/// Per-request admission decisions in front of a [`TaskQueue`].
///
/// One gate per queue per server instance. Waiter poll loops run concurrently
/// with each other and with task execution; they only read the queue's two
/// counters.
pub struct AdmissionGate {
    queue: Arc<TaskQueue>,
    waiters: Arc<WaiterSet>,
    handler: Arc<dyn LimitHandler>,

    max_waiters: usize,
    max_wait: Duration,
    check_interval: Duration,

    bus: Bus,
}

impl AdmissionGate {
    /// Creates a gate in front of `queue` with the given limit handler.
    pub fn new(
        cfg: &GateConfig,
        queue: Arc<TaskQueue>,
        handler: Arc<dyn LimitHandler>,
        bus: Bus,
    ) -> Self {
        Self {
            queue,
            waiters: WaiterSet::new(),
            handler,
            max_waiters: cfg.max_waiters,
            max_wait: cfg.max_wait,
            check_interval: cfg.check_interval_clamped(),
            bus,
        }
    }

    /// Number of currently-parked requests.
    pub fn live_waiters(&self) -> usize {
        self.waiters.len()
    }

    /// Decides whether `request` proceeds now or parks behind the queue.
    ///
    /// Returns [`Admission::Proceed`] when the queue is idle (immediately or
    /// after draining), [`Admission::Limited`] with the handler's response
    /// when a cap trips, or the handler's error verbatim.
    pub async fn admit(&self, request: RequestInfo) -> Result<Admission, GateError> {
        // Steady-state path: two atomic loads, nothing allocated.
        if self.queue.snapshot().is_idle() {
            return Ok(Admission::Proceed);
        }
        self.park(request).await
    }

    async fn park(&self, request: RequestInfo) -> Result<Admission, GateError> {
        let started_at = Instant::now();
        let guard = self.waiters.park(started_at);
        let id = guard.id();

        let snap = self.queue.snapshot();
        self.bus.publish(
            Event::now(EventKind::WaiterParked)
                .with_waiter(id)
                .with_counts(snap.pending, snap.active),
        );

        let mut ticker = time::interval(self.check_interval);
        loop {
            // The first tick completes immediately: a queue that drained
            // between the entry check and the park adds ~zero latency.
            ticker.tick().await;

            if self.queue.snapshot().is_idle() {
                self.bus.publish(
                    Event::now(EventKind::WaiterReleased)
                        .with_waiter(id)
                        .with_waited(started_at.elapsed()),
                );
                return Ok(Admission::Proceed);
            }

            let live = self.waiters.len();
            let waited = started_at.elapsed();
            let cause = if live > self.max_waiters {
                Some(LimitCause::WaiterCap)
            } else if waited > self.max_wait {
                Some(LimitCause::WaitBudget)
            } else {
                None
            };
            let Some(cause) = cause else { continue };

            // Release before the handler runs; the guard also covers the
            // error path below.
            drop(guard);
            self.bus.publish(
                Event::now(EventKind::LimitReached)
                    .with_waiter(id)
                    .with_reason(cause.as_label())
                    .with_waited(waited),
            );
            self.bus.publish(
                Event::now(EventKind::WaiterReleased)
                    .with_waiter(id)
                    .with_waited(waited),
            );

            let ctx = LimitContext {
                request,
                cause,
                waited,
                live_waiters: live,
            };
            let response = self.handler.on_limit(ctx).await?;
            return Ok(Admission::Limited(response));
        }
    }
}
