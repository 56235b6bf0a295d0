//! # Framework-agnostic request and response surfaces.
//!
//! The gate does not depend on any particular HTTP framework. The host hands
//! it a [`RequestInfo`] (opaque metadata, used only for events and the limit
//! handler), and limit handlers produce a [`Response`] the host maps onto its
//! own reply type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque metadata about the inbound request.
///
/// The gate never inspects these fields; they exist so a custom limit handler
/// can vary its response per request.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// HTTP-analogous method, if the host cares to supply it.
    pub method: Option<String>,
    /// Request path, if the host cares to supply it.
    pub path: Option<String>,
}

/// Terminal response for a blocked-and-limited request.
///
/// Status plus headers plus an optional JSON body; the host adapts this onto
/// its reply type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl Response {
    /// Creates a response with the given status and no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Response status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// First header value matching `name` (ASCII case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Body shape emitted by the built-in 503 responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitBody {
    /// Always `false` for a limited request.
    pub success: bool,
    /// Mirrors the response status.
    pub code: u16,
    /// Human-readable status message.
    pub message: String,
}

impl LimitBody {
    /// The body the built-in responder sends.
    pub fn service_unavailable() -> Self {
        Self {
            success: false,
            code: 503,
            message: "Service Unavailable".to_string(),
        }
    }
}
