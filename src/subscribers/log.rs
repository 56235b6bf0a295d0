//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [queue-started] pending=2
//! [starting] task=warmup
//! [timeout] task=warmup timeout=60000ms
//! [failed] task=warmup err="execution failed: boom"
//! [parked] waiter=3 pending=1 active=1
//! [limit] waiter=3 cause=wait_budget waited=180001ms
//! [released] waiter=3 waited=180001ms
//! [shutdown-requested] task=warmup
//! [queue-stopped] dropped=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Subscribe`] for structured logging or metrics.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::QueueStarted => {
                println!("[queue-started] pending={:?}", e.pending);
            }
            EventKind::QueueStopped => {
                println!("[queue-stopped] dropped={:?}", e.pending);
            }
            EventKind::TaskStarting => {
                if let Some(task) = &e.task {
                    println!("[starting] task={task}");
                }
            }
            EventKind::TaskStopped => {
                println!("[stopped] task={:?}", e.task);
            }
            EventKind::TaskFailed => {
                println!("[failed] task={:?} err={:?}", e.task, e.reason);
            }
            EventKind::TimeoutHit => {
                println!("[timeout] task={:?} timeout={:?}ms", e.task, e.timeout_ms);
            }
            EventKind::WaiterParked => {
                println!(
                    "[parked] waiter={:?} pending={:?} active={:?}",
                    e.waiter, e.pending, e.active
                );
            }
            EventKind::WaiterReleased => {
                println!("[released] waiter={:?} waited={:?}ms", e.waiter, e.waited_ms);
            }
            EventKind::LimitReached => {
                println!(
                    "[limit] waiter={:?} cause={:?} waited={:?}ms",
                    e.waiter, e.reason, e.waited_ms
                );
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] task={:?}", e.task);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
