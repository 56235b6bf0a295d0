//! Bounded-concurrency FIFO task queue with per-task deadlines and a
//! start/stop lifecycle.

mod core;
mod dispatch;

pub use self::core::{QueueSnapshot, TaskQueue};
pub(crate) use self::core::FailureRx;
