//! Per-request dispatch outcome.

use std::time::Duration;

use crate::backend::{BackendResponse, TransportError};

/// Everything a single dispatch attempt can end in.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The resolver has no healthy node for the service.
    NodeNotFound { service: String },

    /// The resolver itself failed.
    ResolutionFailed { service: String, detail: String },

    /// The node's breaker rejected the call.
    BreakerOpen { node_id: String, cool_down: Duration },

    /// The node's breaker is half-open and already running its trial calls.
    BreakerBusy { node_id: String },

    /// The backend call failed at the transport layer.
    Transport { operation: String, error: TransportError },

    /// The backend answered with its own status envelope.
    Backend { operation: String, response: BackendResponse },
}

impl DispatchOutcome {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchOutcome::NodeNotFound { .. } => "node_not_found",
            DispatchOutcome::ResolutionFailed { .. } => "resolution_failed",
            DispatchOutcome::BreakerOpen { .. } => "breaker_open",
            DispatchOutcome::BreakerBusy { .. } => "breaker_busy",
            DispatchOutcome::Transport { error, .. } if error.is_timeout() => "transport_timeout",
            DispatchOutcome::Transport { .. } => "transport_error",
            DispatchOutcome::Backend { .. } => "backend",
        }
    }

    /// Whether the outcome should be logged as an error.
    ///
    /// Backend-declared timeout/internal/unavailable statuses count; any other
    /// declared status is the backend's answer to the client.
    pub fn is_failure(&self) -> bool {
        match self {
            DispatchOutcome::Backend { response, .. } => matches!(response.status, 408 | 500 | 503),
            _ => true,
        }
    }
}
