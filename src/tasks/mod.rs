//! Task abstractions: the [`Task`] trait, the [`TaskFn`] closure adapter,
//! and the shared [`TaskRef`] handle.

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, Task};
pub use task_fn::{TaskFn, TaskRef};
