//! Error types used by the queue, the gate, and submitted tasks.
//!
//! Three enums cover the distinct failure domains:
//!
//! - [`TaskError`] — failures of individual background task executions.
//! - [`SubmitError`] — failures to hand a task to the queue.
//! - [`GateError`] — failures raised while resolving a parked request.
//!
//! Every task failure is treated as fatal to the hosting service (fail-fast
//! policy); there is no retry path anywhere in this crate.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by background task execution.
///
/// Any of these (except [`TaskError::Canceled`]) signals the supervising
/// watcher to run the host shutdown sequence.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task execution exceeded its configured deadline.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task observed queue shutdown and exited early.
    #[error("queue stopped")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use draingate::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// True when this outcome must trip the fail-fast shutdown path.
    ///
    /// Cancellation is a cooperative exit during shutdown, not a failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TaskError::Canceled)
    }

    /// Wraps an arbitrary failure message.
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }
}

/// Error returned by [`TaskQueue::submit`](crate::TaskQueue::submit).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Submission backlog is full.
    #[error("submission backlog full")]
    Full,

    /// Queue has been stopped; no further tasks are accepted.
    #[error("queue stopped")]
    Closed,
}

/// # Errors produced while resolving a parked request.
///
/// The gate never swallows a limit-handler failure: it surfaces here and
/// becomes the blocked request's own outcome (a 500-equivalent at the host).
/// Other waiters and the queue are unaffected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GateError {
    /// The limit-reached handler returned an error.
    #[error("limit handler failed: {error}")]
    Handler {
        /// The underlying error message.
        error: String,
    },
}

impl GateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GateError::Handler { .. } => "limit_handler_failed",
        }
    }

    /// Wraps an arbitrary handler error message.
    pub fn handler(error: impl Into<String>) -> Self {
        GateError::Handler {
            error: error.into(),
        }
    }
}
