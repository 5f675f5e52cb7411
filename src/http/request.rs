//! Inbound request correlation.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::dispatch::correlation::{Correlation, TraceContext, TRACEPARENT, X_AUTHENTICATED_IDENTITY, X_REQUEST_ID};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the request's [`Correlation`].
///
/// A missing request id gets a UUID v4; an absent or malformed `traceparent`
/// starts a new trace.
pub fn correlation_from_headers(headers: &HeaderMap) -> Correlation {
    let request_id = header(headers, X_REQUEST_ID)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let trace_context = header(headers, TRACEPARENT).and_then(TraceContext::parse);
    let identity = header(headers, X_AUTHENTICATED_IDENTITY).map(str::to_string);

    Correlation::new(request_id, trace_context).with_identity(identity)
}
