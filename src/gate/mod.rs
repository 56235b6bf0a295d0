//! Admission gate: per-request entry check, park/poll loop, and the
//! limit-reached handler contract.

mod core;
mod handler;
mod response;
mod waiters;

pub use self::core::{Admission, AdmissionGate};
pub use handler::{HandlerFn, LimitCause, LimitContext, LimitHandler, ServiceUnavailable};
pub use response::{LimitBody, RequestInfo, Response};
