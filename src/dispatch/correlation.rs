//! Request correlation.
//!
//! A [`Correlation`] travels explicitly from the inbound request down to the
//! backend call. The request id is echoed as `x-request-id`; the trace context
//! follows W3C `traceparent` (version 00), with a fresh span id per hop. An
//! authenticated identity, when the edge supplied one, is carried opaquely.

use serde::Serialize;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const TRACEPARENT: &str = "traceparent";
pub const X_AUTHENTICATED_IDENTITY: &str = "x-authenticated-identity";

/// W3C trace context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceContext {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters.
    pub span_id: String,
    pub sampled: bool,
}

impl TraceContext {
    /// Start a new trace.
    pub fn generate() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
            sampled: true,
        }
    }

    /// Parse a `traceparent` header. Returns `None` for anything malformed.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if !is_hex(version, 2) || version == "ff" {
            return None;
        }
        // Version 00 has exactly four fields; later versions may append more.
        if version == "00" && parts.next().is_some() {
            return None;
        }
        if !is_hex(trace_id, 32) || trace_id.bytes().all(|b| b == b'0') {
            return None;
        }
        if !is_hex(span_id, 16) || span_id.bytes().all(|b| b == b'0') {
            return None;
        }
        if !is_hex(flags, 2) {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            sampled: flags & 0x01 == 0x01,
        })
    }

    /// Same trace, new span.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
            sampled: self.sampled,
        }
    }

    pub fn to_header(&self) -> String {
        format!(
            "00-{}-{}-{:02x}",
            self.trace_id,
            self.span_id,
            u8::from(self.sampled)
        )
    }
}

fn new_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Request-scoped identifiers propagated to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlation {
    pub request_id: String,
    pub trace_context: TraceContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl Correlation {
    /// Build from inbound values, starting a new trace when none was supplied.
    pub fn new(request_id: impl Into<String>, trace_context: Option<TraceContext>) -> Self {
        Self {
            request_id: request_id.into(),
            trace_context: trace_context.unwrap_or_else(TraceContext::generate),
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        self.identity = identity;
        self
    }

    /// Fresh request id and trace.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string(), None)
    }

    /// Correlation for an outbound hop: same request id and trace, new span.
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            trace_context: self.trace_context.child(),
            identity: self.identity.clone(),
        }
    }
}
