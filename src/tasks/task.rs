//! # Task abstraction.
//!
//! A [`Task`] is an opaque, asynchronous, cancelable unit of background work.
//! It is submitted once, executed once, and its outcome is never returned to
//! the submitter — a failure instead trips the crate-wide fail-fast path.
//!
//! A task receives a [`CancellationToken`] and should periodically check it to
//! stop cooperatively when the queue is stopped.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future produced by one task execution.
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

/// # Asynchronous, cancelable unit of background work.
///
/// A `Task` has a stable [`name`](Task::name) (for events/logs) and a
/// [`spawn`](Task::spawn) method producing a fresh future per execution.
/// Implementors should regularly check cancellation and exit promptly when
/// the queue is being stopped.
///
/// # Example
/// ```
/// use std::future::Future;
/// use tokio_util::sync::CancellationToken;
/// use draingate::{BoxTaskFuture, Task, TaskError};
///
/// struct Warmup;
///
/// impl Task for Warmup {
///     fn name(&self) -> &str { "warmup" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(TaskError::Canceled);
///             }
///             // do work...
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Produces a fresh future executing the task once.
    ///
    /// Implementations should check `ctx.is_cancelled()` and exit quickly to
    /// honor queue shutdown.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
