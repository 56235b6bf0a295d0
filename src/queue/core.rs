//! # TaskQueue: bounded-concurrency FIFO execution with a fatal-failure signal.
//!
//! The queue buffers submissions in a bounded channel, dispatches them in
//! submission order once [`start`](TaskQueue::start) is called, and runs up to
//! `concurrency` tasks in parallel (default 1, strictly serial). Each task is
//! subject to an optional execution deadline.
//!
//! ## Architecture
//! ```text
//! submit(task) ──► [mpsc backlog] ──► dispatcher ──► permit ──► worker ──► run_once
//!                      │                  │                        │
//!                  pending += 1      pending -= 1             active -= 1
//!                                    active += 1                  │
//!                                                         Err(fatal) ──► failure channel
//! ```
//!
//! ## Rules
//! - **FIFO dispatch**: the dispatcher pulls the next task only after securing
//!   a concurrency permit, so dispatch order equals submission order.
//! - **Buffered before start**: `submit()` works at any time; nothing executes
//!   until `start()`.
//! - **Fail-fast**: any fatal task outcome (failure or deadline) is pushed to
//!   the failure channel; the supervising watcher turns the first one into a
//!   host shutdown. No retries, no isolation.
//! - **Stop masks the counters**: `stop()` drops the backlog and makes every
//!   subsequent [`snapshot`](TaskQueue::snapshot) read idle, so parked pollers
//!   resolve naturally. In-flight work is signalled to cancel cooperatively
//!   but never forcibly aborted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::GateConfig;
use crate::error::{SubmitError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::queue::dispatch;
use crate::tasks::TaskRef;

/// Receiver half of the fatal-failure channel, consumed by the watcher.
pub(crate) type FailureRx = mpsc::Receiver<(Arc<str>, TaskError)>;

/// Non-blocking view of outstanding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Tasks submitted but not yet dispatched to a worker.
    pub pending: usize,
    /// Tasks currently executing.
    pub active: usize,
}

impl QueueSnapshot {
    /// True when no task is pending or executing.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.active == 0
    }
}

/// Bounded-concurrency FIFO task queue.
///
/// One instance per server; created stopped, started when the host signals
/// readiness, stopped permanently on host shutdown.
pub struct TaskQueue {
    tx: mpsc::Sender<TaskRef>,
    // Taken exactly once by start(); never locked across await points.
    rx: Mutex<Option<mpsc::Receiver<TaskRef>>>,

    pending: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,

    started: AtomicBool,
    stopped: CancellationToken,

    concurrency: usize,
    task_timeout: Option<std::time::Duration>,

    bus: Bus,
    failures: mpsc::Sender<(Arc<str>, TaskError)>,
}

impl TaskQueue {
    /// Creates a stopped queue plus the failure-channel receiver the
    /// supervising watcher listens on.
    pub fn new(cfg: &GateConfig, bus: Bus) -> (Arc<Self>, FailureRx) {
        let (tx, rx) = mpsc::channel(cfg.backlog.max(1));
        let (failures, failure_rx) = mpsc::channel(16);

        let queue = Arc::new(Self {
            tx,
            rx: Mutex::new(Some(rx)),
            pending: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            started: AtomicBool::new(false),
            stopped: CancellationToken::new(),
            concurrency: cfg.concurrency_clamped(),
            task_timeout: cfg.task_timeout_opt(),
            bus,
            failures,
        });
        (queue, failure_rx)
    }

    /// Enqueues a task. Returns immediately; the outcome is never reported
    /// back to the caller.
    ///
    /// Tasks submitted before [`start`](TaskQueue::start) are buffered, not
    /// executed, but they do count as pending — the gate parks requests
    /// behind them.
    pub fn submit(&self, task: TaskRef) -> Result<(), SubmitError> {
        if self.stopped.is_cancelled() {
            return Err(SubmitError::Closed);
        }
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Begins dispatching buffered and future submissions. Idempotent.
    ///
    /// Call after the host finished its own setup, so queue-draining work
    /// never races with not-yet-registered routes.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(rx) = rx else { return };

        self.bus.publish(
            Event::now(EventKind::QueueStarted)
                .with_counts(self.pending.load(Ordering::SeqCst), 0),
        );

        tokio::spawn(dispatch_loop(DispatchCtx {
            rx,
            semaphore: Arc::new(Semaphore::new(self.concurrency)),
            pending: Arc::clone(&self.pending),
            active: Arc::clone(&self.active),
            stopped: self.stopped.clone(),
            task_timeout: self.task_timeout,
            bus: self.bus.clone(),
            failures: self.failures.clone(),
        }));
    }

    /// Stops the queue: the backlog is dropped, no further submissions are
    /// accepted, and subsequent snapshots read idle. Idempotent.
    ///
    /// In-flight tasks receive a cooperative cancellation signal but are not
    /// forcibly aborted; their completion is fire-and-forget from here on.
    pub fn stop(&self) {
        if self.stopped.is_cancelled() {
            return;
        }
        let dropped = self.pending.load(Ordering::SeqCst);
        self.stopped.cancel();
        self.bus.publish(
            Event::now(EventKind::QueueStopped)
                .with_counts(dropped, self.active.load(Ordering::SeqCst)),
        );
    }

    /// Returns `{pending, active}` without blocking or mutating state.
    ///
    /// After [`stop`](TaskQueue::stop) this always reads idle, regardless of
    /// in-flight work, so pollers observing the queue resolve promptly.
    pub fn snapshot(&self) -> QueueSnapshot {
        if self.stopped.is_cancelled() {
            return QueueSnapshot {
                pending: 0,
                active: 0,
            };
        }
        QueueSnapshot {
            pending: self.pending.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
        }
    }

    /// True once [`start`](TaskQueue::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// True once [`stop`](TaskQueue::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }
}

/// Everything the dispatcher loop owns.
struct DispatchCtx {
    rx: mpsc::Receiver<TaskRef>,
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    stopped: CancellationToken,
    task_timeout: Option<std::time::Duration>,
    bus: Bus,
    failures: mpsc::Sender<(Arc<str>, TaskError)>,
}

/// Pulls tasks in submission order, gates each behind a concurrency permit,
/// and runs it on its own worker.
async fn dispatch_loop(mut ctx: DispatchCtx) {
    loop {
        let task = tokio::select! {
            _ = ctx.stopped.cancelled() => break,
            msg = ctx.rx.recv() => match msg {
                Some(task) => task,
                None => break,
            },
        };

        // Permit first, pull next task after: keeps dispatch FIFO.
        let permit = tokio::select! {
            _ = ctx.stopped.cancelled() => break,
            permit = Arc::clone(&ctx.semaphore).acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };

        ctx.pending.fetch_sub(1, Ordering::SeqCst);
        ctx.active.fetch_add(1, Ordering::SeqCst);

        let active = Arc::clone(&ctx.active);
        let cancel = ctx.stopped.clone();
        let bus = ctx.bus.clone();
        let failures = ctx.failures.clone();
        let timeout = ctx.task_timeout;

        tokio::spawn(async move {
            let _permit = permit;
            let name: Arc<str> = Arc::from(task.name());
            bus.publish(Event::now(EventKind::TaskStarting).with_task(Arc::clone(&name)));

            let res = dispatch::run_once(task.as_ref(), &cancel, timeout, &bus).await;
            active.fetch_sub(1, Ordering::SeqCst);

            if let Err(err) = res {
                if err.is_fatal() {
                    // Watcher may already be gone after the first failure.
                    let _ = failures.try_send((name, err));
                }
            }
        });
    }
    // Dropping rx here clears whatever backlog was left.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn queue_with(cfg: GateConfig) -> (Arc<TaskQueue>, FailureRx, Bus) {
        let bus = Bus::new(64);
        let (q, failures) = TaskQueue::new(&cfg, bus.clone());
        (q, failures, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_until_start() {
        let (q, _failures, _bus) = queue_with(GateConfig::default());
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        q.submit(TaskFn::arc("buffered", move |_ctx| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        }))
        .expect("submit");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!ran.load(Ordering::SeqCst), "task ran before start()");
        assert_eq!(q.snapshot().pending, 1);

        q.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(ran.load(Ordering::SeqCst));
        assert!(q.snapshot().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_dispatch_with_serial_concurrency() {
        let (q, _failures, _bus) = queue_with(GateConfig::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3u32 {
            let order = Arc::clone(&order);
            q.submit(TaskFn::arc(format!("t{i}"), move |_ctx| {
                let order = Arc::clone(&order);
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    order.lock().unwrap().push(i);
                    Ok(())
                }
            }))
            .expect("submit");
        }

        q.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bound_is_respected() {
        let cfg = GateConfig {
            concurrency: 2,
            ..GateConfig::default()
        };
        let (q, _failures, _bus) = queue_with(cfg);

        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..5u32 {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            q.submit(TaskFn::arc(format!("t{i}"), move |_ctx| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .expect("submit");
        }

        q.start();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(peak.load(Ordering::SeqCst) <= 2, "exceeded concurrency cap");
        assert!(q.snapshot().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_masks_snapshot_and_closes_intake() {
        let (q, _failures, _bus) = queue_with(GateConfig::default());

        q.submit(TaskFn::arc("long", |_ctx| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }))
        .expect("submit");
        q.submit(TaskFn::arc("backlogged", |_ctx| async { Ok(()) }))
            .expect("submit");

        q.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!q.snapshot().is_idle());

        q.stop();
        q.stop(); // idempotent
        assert!(q.snapshot().is_idle(), "post-stop snapshot must read idle");
        assert!(q.is_stopped());

        let err = q
            .submit(TaskFn::arc("late", |_ctx| async { Ok(()) }))
            .unwrap_err();
        assert_eq!(err, SubmitError::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_failure_reaches_failure_channel() {
        let (q, mut failures, _bus) = queue_with(GateConfig::default());

        q.submit(TaskFn::arc("boom", |_ctx| async {
            Err(TaskError::fail("boom"))
        }))
        .expect("submit");
        q.start();

        let (name, err) = failures.recv().await.expect("failure signal");
        assert_eq!(&*name, "boom");
        assert_eq!(err.as_label(), "task_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_hits_failure_channel_and_bus() {
        let cfg = GateConfig {
            task_timeout: Duration::from_millis(50),
            ..GateConfig::default()
        };
        let (q, mut failures, bus) = queue_with(cfg);
        let mut events = bus.subscribe();

        q.submit(TaskFn::arc("slow", |_ctx| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(())
        }))
        .expect("submit");
        q.start();

        let (name, err) = failures.recv().await.expect("failure signal");
        assert_eq!(&*name, "slow");
        assert!(matches!(err, TaskError::Timeout { .. }));

        let mut saw_timeout_hit = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::TimeoutHit {
                saw_timeout_hit = true;
                assert_eq!(ev.timeout_ms, Some(50));
            }
        }
        assert!(saw_timeout_hit, "expected a TimeoutHit event");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (q, _failures, _bus) = queue_with(GateConfig::default());
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        q.submit(TaskFn::arc("once", move |_ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .expect("submit");

        q.start();
        q.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
