//! # draingate
//!
//! Admission control for services that must finish deferred background work
//! before serving traffic: a bounded task queue plus a polling gate that
//! parks inbound requests until the queue drains, and turns the first task
//! failure into a host shutdown.
//!
//! ## Architecture
//!
//! ```text
//!              ┌─────────────────────────────────────────────┐
//!              │                 Gatekeeper                  │
//!              │  builder · on_ready/on_close · fail-fast    │
//!              └───────┬──────────────────────────┬──────────┘
//!                      │                          │
//!               ┌──────▼──────┐            ┌──────▼──────┐
//!  add_task ───►│  TaskQueue  │  snapshot  │ Admission   │◄─── admit
//!               │ FIFO, caps, │◄───────────│    Gate     │
//!               │  deadlines  │            │ park + poll │
//!               └──────┬──────┘            └──────┬──────┘
//!                      │        ┌─────┐          │
//!                      └───────►│ Bus │◄─────────┘
//!                               └──┬──┘
//!                          ┌───────▼────────┐
//!                          │ SubscriberSet  │  bounded queues,
//!                          │  (observers)   │  panic-isolated
//!                          └────────────────┘
//! ```
//!
//! - [`TaskQueue`] buffers tasks until the host is ready, then drains them
//!   FIFO under a concurrency cap, each with an optional deadline.
//! - [`AdmissionGate`] answers one question per request: proceed now, keep
//!   waiting, or hand the request to a [`LimitHandler`] once a cap trips.
//! - [`Gatekeeper`] binds both to the host lifecycle and shuts the host down
//!   (exactly once) when a task fails.
//!
//! ## Example
//!
//! ```rust
//! use draingate::{Admission, GateConfig, Gatekeeper, RequestInfo, TaskFn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let keeper = Gatekeeper::builder(GateConfig::default()).build();
//!
//!     // Deferred startup work; buffered until on_ready().
//!     keeper
//!         .add_task(TaskFn::arc("warm-cache", |_ctx| async {
//!             // load data, run migrations, ...
//!             Ok(())
//!         }))
//!         .unwrap();
//!
//!     keeper.on_ready();
//!
//!     // In the request path:
//!     match keeper.admit(RequestInfo::default()).await.unwrap() {
//!         Admission::Proceed => { /* run the route handler */ }
//!         Admission::Limited(resp) => {
//!             assert_eq!(resp.status(), 503);
//!         }
//!     }
//!
//!     keeper.on_close();
//! }
//! ```

mod config;
mod error;
mod events;
mod gate;
mod gatekeeper;
mod queue;
mod subscribers;
mod tasks;

pub use config::GateConfig;
pub use error::{GateError, SubmitError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use gate::{
    Admission, AdmissionGate, HandlerFn, LimitBody, LimitCause, LimitContext, LimitHandler,
    RequestInfo, Response, ServiceUnavailable,
};
pub use gatekeeper::{Gatekeeper, GatekeeperBuilder, ShutdownHook};
pub use queue::{QueueSnapshot, TaskQueue};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
