//! # Limit-reached handler contract.
//!
//! When a parked request trips the waiter cap or its wait budget, the gate
//! invokes a [`LimitHandler`] to produce the terminal response. The contract
//! is uniformly asynchronous — a synchronous handler simply returns a ready
//! future — so the gate always awaits one consistent completion signal.
//!
//! A handler error is **not** swallowed: it propagates as the blocked
//! request's own outcome (see [`GateError`]).
//!
//! The built-in [`ServiceUnavailable`] responder emits status 503 with a
//! `Retry-After` hint and a structured JSON body.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::GateError;
use crate::gate::response::{RequestInfo, Response};

/// Which limit tripped for a parked request.
///
/// Both checks run on the same poll tick, count before duration; under a
/// simultaneous breach the handler observes [`LimitCause::WaiterCap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCause {
    /// The live-waiter count exceeded `max_waiters`.
    WaiterCap,
    /// The request's parked time exceeded `max_wait`.
    WaitBudget,
}

impl LimitCause {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LimitCause::WaiterCap => "waiter_cap",
            LimitCause::WaitBudget => "wait_budget",
        }
    }
}

/// Everything a limit handler gets to know about the blocked request.
#[derive(Debug, Clone)]
pub struct LimitContext {
    /// Host-supplied request metadata.
    pub request: RequestInfo,
    /// Which limit tripped.
    pub cause: LimitCause,
    /// How long the request was parked before the limit fired.
    pub waited: Duration,
    /// Live-waiter count observed on the tripping tick (includes this one).
    pub live_waiters: usize,
}

/// Pluggable producer of the terminal response for a limited request.
///
/// Invoked exactly once per limited request; its response fully replaces the
/// built-in one.
#[async_trait]
pub trait LimitHandler: Send + Sync + 'static {
    /// Produces the terminal response for the blocked request.
    async fn on_limit(&self, ctx: LimitContext) -> Result<Response, GateError>;
}

/// Function-backed limit handler.
///
/// Wraps a closure `F: Fn(LimitContext) -> Fut`, mirroring
/// [`TaskFn`](crate::TaskFn) for tasks.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use draingate::{HandlerFn, LimitContext, LimitHandler, Response};
///
/// let teapot: Arc<dyn LimitHandler> = HandlerFn::arc(|_ctx: LimitContext| async {
///     Ok(Response::new(418))
/// });
/// ```
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> LimitHandler for HandlerFn<F>
where
    F: Fn(LimitContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, GateError>> + Send + 'static,
{
    async fn on_limit(&self, ctx: LimitContext) -> Result<Response, GateError> {
        (self.f)(ctx).await
    }
}

/// Built-in 503 responder.
///
/// Emits status 503, `Retry-After` set to the configured maximum wait in
/// whole seconds, and the body
/// `{"success": false, "code": 503, "message": "Service Unavailable"}`.
pub struct ServiceUnavailable {
    retry_after: Duration,
}

impl ServiceUnavailable {
    /// Creates the responder with the given `Retry-After` hint.
    pub fn new(retry_after: Duration) -> Self {
        Self { retry_after }
    }
}

#[async_trait]
impl LimitHandler for ServiceUnavailable {
    async fn on_limit(&self, _ctx: LimitContext) -> Result<Response, GateError> {
        Ok(Response::new(503)
            .with_header("Retry-After", self.retry_after.as_secs().to_string())
            .with_body(json!({
                "success": false,
                "code": 503,
                "message": "Service Unavailable",
            })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::response::LimitBody;

    fn ctx(cause: LimitCause) -> LimitContext {
        LimitContext {
            request: RequestInfo::default(),
            cause,
            waited: Duration::from_secs(3),
            live_waiters: 2,
        }
    }

    #[tokio::test]
    async fn test_default_responder_shape() {
        let handler = ServiceUnavailable::new(Duration::from_secs(180));
        let resp = handler.on_limit(ctx(LimitCause::WaiterCap)).await.unwrap();

        assert_eq!(resp.status(), 503);
        assert_eq!(resp.header("retry-after"), Some("180"));

        let body: LimitBody =
            serde_json::from_value(resp.body().cloned().expect("body")).expect("shape");
        assert_eq!(body, LimitBody::service_unavailable());
    }

    #[tokio::test]
    async fn test_handler_fn_sync_and_async_styles() {
        // Synchronous internally: returns a ready future.
        let sync_like = HandlerFn::new(|_ctx: LimitContext| async { Ok(Response::new(429)) });
        assert_eq!(
            sync_like.on_limit(ctx(LimitCause::WaitBudget)).await.unwrap().status(),
            429
        );

        // Asynchronous internally: awaits before responding.
        let async_like = HandlerFn::new(|_ctx: LimitContext| async {
            tokio::task::yield_now().await;
            Ok(Response::new(429))
        });
        assert_eq!(
            async_like.on_limit(ctx(LimitCause::WaitBudget)).await.unwrap().status(),
            429
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_returned_not_swallowed() {
        let failing = HandlerFn::new(|_ctx: LimitContext| async {
            Err::<Response, _>(GateError::handler("here"))
        });
        let err = failing.on_limit(ctx(LimitCause::WaiterCap)).await.unwrap_err();
        assert_eq!(err.as_label(), "limit_handler_failed");
    }

    #[test]
    fn test_cause_labels() {
        assert_eq!(LimitCause::WaiterCap.as_label(), "waiter_cap");
        assert_eq!(LimitCause::WaitBudget.as_label(), "wait_budget");
    }
}
