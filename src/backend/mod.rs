//! Backend RPC subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (inside Breaker::run)
//!     → BackendClient::invoke(operation, address, payload, correlation)
//!         - http.rs: POST {scheme}://{address}/{operation}, JSON envelope
//!     → BackendResponse (backend-declared status/code/message)
//!       or TransportError (the call itself failed)
//! ```
//!
//! # Design Decisions
//! - Declared statuses are data, not errors; only transport failures trip breakers
//! - Timeouts are enforced here, independent of the breaker cool-down

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::Correlation;

pub use http::HttpBackendClient;

/// Backend-declared result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// HTTP-style status the backend declares for the operation.
    pub status: u16,
    /// Backend-specific code.
    #[serde(default)]
    pub code: i32,
    #[serde(default, alias = "msg")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl BackendResponse {
    pub fn new(status: u16, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            body: None,
        }
    }
}

/// Failure of the RPC transport itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// Underlying detail without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            TransportError::Timeout(d)
            | TransportError::Connect(d)
            | TransportError::Malformed(d)
            | TransportError::Request(d) => d,
        }
    }
}

/// Backend operation invoker.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Invoke `operation` on the node at `address`.
    async fn invoke(
        &self,
        operation: &str,
        address: &str,
        payload: &Value,
        correlation: &Correlation,
    ) -> Result<BackendResponse, TransportError>;
}
