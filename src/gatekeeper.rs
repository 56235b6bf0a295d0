//! # Gatekeeper: wires the queue, the gate, and the fail-fast watcher together.
//!
//! [`Gatekeeper`] owns the event bus, the [`TaskQueue`], the
//! [`AdmissionGate`], and the watcher that turns the first task failure into
//! the host shutdown sequence. It maps directly onto the host's lifecycle:
//!
//! ```text
//! host "ready"     ──► on_ready()  ──► queue.start()
//! host "shutdown"  ──► on_close()  ──► queue.stop(), listener drains, token cancelled
//! every request    ──► admit()     ──► Proceed | Limited(response) | handler error
//! application      ──► add_task()  ──► queue.submit()  (any time after build)
//!
//! task failure ──► watcher ──► ShutdownRequested event
//!                             ──► queue.stop()
//!                             ──► shutdown token cancelled + hook (exactly once)
//! ```
//!
//! The shutdown hook runs at most once no matter how many tasks fail; later
//! failure signals from in-flight work are ignored.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::GateConfig;
use crate::error::{GateError, SubmitError};
use crate::events::{Bus, Event, EventKind};
use crate::gate::{Admission, AdmissionGate, LimitHandler, RequestInfo, ServiceUnavailable};
use crate::queue::{FailureRx, QueueSnapshot, TaskQueue};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::TaskRef;

/// Host-supplied callback invoked when a task failure demands shutdown.
pub type ShutdownHook = Arc<dyn Fn() + Send + Sync>;

/// Builder for a [`Gatekeeper`] with optional subscribers, a custom limit
/// handler, and a shutdown hook.
pub struct GatekeeperBuilder {
    cfg: GateConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    handler: Option<Arc<dyn LimitHandler>>,
    shutdown_hook: Option<ShutdownHook>,
}

impl GatekeeperBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: GateConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            handler: None,
            shutdown_hook: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (queue lifecycle, waiter activity,
    /// failures) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the built-in 503 responder for limited requests.
    pub fn with_limit_handler(mut self, handler: Arc<dyn LimitHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the callback invoked (once) when a task failure demands shutdown.
    ///
    /// The shutdown token is cancelled regardless; the hook is for hosts that
    /// need an imperative close call.
    pub fn with_shutdown_hook(mut self, hook: ShutdownHook) -> Self {
        self.shutdown_hook = Some(hook);
        self
    }

    /// Builds the gatekeeper and spawns its background plumbing
    /// (subscriber listener and failure watcher).
    pub fn build(self) -> Arc<Gatekeeper> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let shutdown = CancellationToken::new();

        spawn_subscriber_listener(
            SubscriberSet::new(self.subscribers),
            bus.clone(),
            shutdown.clone(),
        );

        let (queue, failures) = TaskQueue::new(&self.cfg, bus.clone());
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(ServiceUnavailable::new(self.cfg.max_wait)));
        let gate = AdmissionGate::new(&self.cfg, Arc::clone(&queue), handler, bus.clone());

        spawn_failure_watcher(
            failures,
            bus.clone(),
            Arc::clone(&queue),
            shutdown.clone(),
            self.shutdown_hook,
        );

        Arc::new(Gatekeeper {
            bus,
            queue,
            gate,
            shutdown,
        })
    }
}

/// Owner of one queue + gate pair, bound to the host process lifecycle.
pub struct Gatekeeper {
    bus: Bus,
    queue: Arc<TaskQueue>,
    gate: AdmissionGate,
    shutdown: CancellationToken,
}

impl Gatekeeper {
    /// Starts building a gatekeeper from the given configuration.
    pub fn builder(cfg: GateConfig) -> GatekeeperBuilder {
        GatekeeperBuilder::new(cfg)
    }

    /// Host signalled readiness: begin draining the task queue. Idempotent.
    pub fn on_ready(&self) {
        self.queue.start();
    }

    /// Host is shutting down: stop the queue (backlog cleared, snapshots read
    /// idle so parked requests resolve) and wind down the event plumbing.
    /// Idempotent.
    pub fn on_close(&self) {
        self.queue.stop();
        self.shutdown.cancel();
    }

    /// Submits a background task. Available at any time after build; tasks
    /// submitted before [`on_ready`](Gatekeeper::on_ready) are buffered.
    pub fn add_task(&self, task: TaskRef) -> Result<(), SubmitError> {
        self.queue.submit(task)
    }

    /// Entry interception point: call for every inbound request before
    /// routing/handler dispatch.
    pub async fn admit(&self, request: RequestInfo) -> Result<Admission, GateError> {
        self.gate.admit(request).await
    }

    /// Non-blocking view of outstanding queue work.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Number of currently-parked requests.
    pub fn live_waiters(&self) -> usize {
        self.gate.live_waiters()
    }

    /// Token cancelled when a task failure demands shutdown, or when
    /// [`on_close`](Gatekeeper::on_close) runs. Hosts select on this to drive
    /// their own teardown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Independent receiver of runtime events (for ad-hoc observation; prefer
    /// [`Subscribe`] for long-lived consumers).
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}

/// Forwards bus events to the subscriber set until shutdown, then drains it.
fn spawn_subscriber_listener(set: SubscriberSet, bus: Bus, shutdown: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                },
            }
        }
        set.shutdown().await;
    });
}

/// Turns the first fatal task outcome into the host shutdown sequence.
///
/// Exactly once: the watcher exits after the first signal; later failures
/// from in-flight tasks find a closed channel and are dropped.
fn spawn_failure_watcher(
    mut failures: FailureRx,
    bus: Bus,
    queue: Arc<TaskQueue>,
    shutdown: CancellationToken,
    hook: Option<ShutdownHook>,
) {
    tokio::spawn(async move {
        if let Some((task, err)) = failures.recv().await {
            bus.publish(
                Event::now(EventKind::ShutdownRequested)
                    .with_task(task)
                    .with_reason(err.to_string()),
            );
            queue.stop();
            shutdown.cancel();
            if let Some(hook) = hook {
                hook();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_buffer_start_close() {
        let keeper = Gatekeeper::builder(GateConfig::default()).build();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        keeper
            .add_task(TaskFn::arc("setup", move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .expect("add_task");

        // Buffered until the host signals ready.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(keeper.snapshot().pending, 1);

        keeper.on_ready();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(keeper.snapshot().is_idle());

        keeper.on_close();
        keeper.on_close(); // idempotent
        let err = keeper
            .add_task(TaskFn::arc("late", |_ctx| async { Ok(()) }))
            .unwrap_err();
        assert_eq!(err, SubmitError::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_passes_when_no_task_was_ever_added() {
        let keeper = Gatekeeper::builder(GateConfig::default()).build();
        keeper.on_ready();

        let verdict = keeper.admit(RequestInfo::default()).await.unwrap();
        assert!(matches!(verdict, Admission::Proceed));
        assert_eq!(keeper.live_waiters(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_failure_runs_shutdown_exactly_once() {
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hook_calls);
        let keeper = Gatekeeper::builder(GateConfig {
            concurrency: 2,
            ..GateConfig::default()
        })
        .with_shutdown_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build();

        for name in ["boom-1", "boom-2"] {
            keeper
                .add_task(TaskFn::arc(name, |_ctx| async {
                    Err(TaskError::fail("boom"))
                }))
                .expect("add_task");
        }
        keeper.on_ready();

        keeper.shutdown_token().cancelled().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
        assert!(keeper.snapshot().is_idle(), "queue must be stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_event_is_published() {
        let keeper = Gatekeeper::builder(GateConfig::default()).build();
        let mut events = keeper.events();

        keeper
            .add_task(TaskFn::arc("boom", |_ctx| async {
                Err(TaskError::fail("boom"))
            }))
            .expect("add_task");
        keeper.on_ready();
        keeper.shutdown_token().cancelled().await;

        let mut saw_shutdown = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::ShutdownRequested {
                saw_shutdown = true;
                assert_eq!(ev.task.as_deref(), Some("boom"));
            }
        }
        assert!(saw_shutdown, "expected a ShutdownRequested event");
    }
}
