//! # Run a single execution of a task.
//!
//! Executes one task with an optional deadline and publishes lifecycle events
//! to the [`Bus`]. There are no retries anywhere in this crate: one
//! submission, one execution, one terminal event.
//!
//! ## Event flow
//! ```text
//! Success:
//!   task.spawn() → Ok(()) → publish TaskStopped
//!
//! Cancellation (queue stopping):
//!   task.spawn() → Err(Canceled) → publish TaskStopped (graceful exit)
//!
//! Failure:
//!   task.spawn() → Err(Fail) → publish TaskFailed
//!
//! Deadline:
//!   timeout exceeded → cancel child → publish TimeoutHit
//!                                   → publish TaskFailed (timeout)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `TaskStopped` or `TaskFailed`.
//! - `Canceled` is a graceful exit → `TaskStopped`, and is not fatal.
//! - `TimeoutHit` is published **in addition to** `TaskFailed` on deadline.
//! - Derives a child token per execution; child cancellation does not affect
//!   the parent.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::Task;

/// Executes `task` once, publishing lifecycle events to `bus`.
///
/// If `timeout` is `Some(dur)` with `dur > 0`, execution is wrapped in
/// [`tokio::time::timeout`]; on expiry the child token is cancelled,
/// `TimeoutHit` is published, and the result is [`TaskError::Timeout`].
pub(crate) async fn run_once(
    task: &dyn Task,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    bus: &Bus,
) -> Result<(), TaskError> {
    let child = parent.child_token();

    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, task.spawn(child.clone())).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(
                    Event::now(EventKind::TimeoutHit)
                        .with_task(task.name())
                        .with_timeout(dur),
                );
                Err(TaskError::Timeout { timeout: dur })
            }
        }
    } else {
        task.spawn(child.clone()).await
    };

    match res {
        Ok(()) => {
            bus.publish(Event::now(EventKind::TaskStopped).with_task(task.name()));
            Ok(())
        }
        Err(TaskError::Canceled) => {
            bus.publish(Event::now(EventKind::TaskStopped).with_task(task.name()));
            Err(TaskError::Canceled)
        }
        Err(e) => {
            bus.publish(
                Event::now(EventKind::TaskFailed)
                    .with_task(task.name())
                    .with_reason(e.to_string()),
            );
            Err(e)
        }
    }
}
