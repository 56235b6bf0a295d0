//! # Gate and queue configuration.
//!
//! [`GateConfig`] centralizes every tunable of the crate. It is immutable after
//! [`Gatekeeper::builder`](crate::Gatekeeper::builder) consumes it.
//!
//! ## Sentinel values
//! - `task_timeout = 0s` → no per-task deadline
//! - `concurrency = 0` → treated as 1 (strictly serial dispatch)
//! - `check_interval = 0s` → clamped to 1ms to keep the poll loop cooperative

use std::time::Duration;

/// Configuration for the task queue and the admission gate.
///
/// ## Field semantics
/// - `concurrency`: max tasks executing in parallel (`0` treated as `1`)
/// - `task_timeout`: per-task execution deadline (`0s` = none)
/// - `max_waiters`: parked requests admitted before the limit handler fires;
///   the cap is strict — exactly `max_waiters` may wait, the next one trips
/// - `max_wait`: longest a single request may stay parked
/// - `check_interval`: poll tick period for parked requests
/// - `backlog`: submission channel capacity (tasks buffered before `start()`)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Maximum number of tasks executing in parallel.
    pub concurrency: usize,

    /// Per-task execution deadline before forced failure.
    ///
    /// `Duration::ZERO` disables the deadline.
    pub task_timeout: Duration,

    /// Maximum concurrently parked requests before the limit handler fires.
    pub max_waiters: usize,

    /// Maximum time a single request may stay parked.
    pub max_wait: Duration,

    /// Poll tick period for parked requests.
    ///
    /// Each waiter also performs one immediate check when it parks, so the
    /// first tick adds no latency.
    pub check_interval: Duration,

    /// Capacity of the task submission backlog.
    ///
    /// Tasks submitted before `start()` are buffered here.
    pub backlog: usize,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Subscribers that lag behind more than this many events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl GateConfig {
    /// Returns the dispatch concurrency with the zero sentinel resolved.
    #[inline]
    pub fn concurrency_clamped(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Returns the per-task deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → applied per execution
    #[inline]
    pub fn task_timeout_opt(&self) -> Option<Duration> {
        if self.task_timeout == Duration::ZERO {
            None
        } else {
            Some(self.task_timeout)
        }
    }

    /// Returns the poll period clamped to a 1ms floor.
    ///
    /// A zero interval would turn the cooperative poll loop into a busy spin.
    #[inline]
    pub fn check_interval_clamped(&self) -> Duration {
        self.check_interval.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for GateConfig {
    /// Default configuration:
    ///
    /// - `concurrency = 1` (strictly serial)
    /// - `task_timeout = 60s`
    /// - `max_waiters = 100` (unbounded waiting risks memory exhaustion)
    /// - `max_wait = 180s`
    /// - `check_interval = 1s`
    /// - `backlog = 1024`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            concurrency: 1,
            task_timeout: Duration::from_secs(60),
            max_waiters: 100,
            max_wait: Duration::from_secs(180),
            check_interval: Duration::from_secs(1),
            backlog: 1024,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = GateConfig::default();
        assert_eq!(cfg.concurrency, 1);
        assert_eq!(cfg.task_timeout, Duration::from_secs(60));
        assert_eq!(cfg.max_waiters, 100);
        assert_eq!(cfg.max_wait, Duration::from_secs(180));
        assert_eq!(cfg.check_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_concurrency_clamps_to_serial() {
        let cfg = GateConfig {
            concurrency: 0,
            ..GateConfig::default()
        };
        assert_eq!(cfg.concurrency_clamped(), 1);
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let cfg = GateConfig {
            task_timeout: Duration::ZERO,
            ..GateConfig::default()
        };
        assert_eq!(cfg.task_timeout_opt(), None);
    }

    #[test]
    fn test_zero_interval_clamps_to_floor() {
        let cfg = GateConfig {
            check_interval: Duration::ZERO,
            ..GateConfig::default()
        };
        assert_eq!(cfg.check_interval_clamped(), Duration::from_millis(1));
    }
}
