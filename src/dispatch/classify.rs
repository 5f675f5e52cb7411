//! Outcome classification and response rendering.
//!
//! Every [`DispatchOutcome`] maps to exactly one [`ErrorClassification`]; the
//! mapping is pure and never fails.

use serde::Serialize;
use serde_json::Value;

use crate::config::schema::DispatchConfig;
use crate::dispatch::outcome::DispatchOutcome;

/// Gateway-specific response codes.
pub mod codes {
    /// No registered node is available for the requested service.
    pub const AVAILABLE_SERVICE_NOT_EXIST: i32 = 1001;
    /// The selected node's circuit breaker is open.
    pub const CIRCUIT_BREAKER_OPEN: i32 = 1002;
}

/// Client-facing status triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorClassification {
    pub http_status: u16,
    pub code: i32,
    pub message: String,
}

impl ErrorClassification {
    fn new(http_status: u16, code: i32, message: impl Into<String>) -> Self {
        Self {
            http_status,
            code,
            message: message.into(),
        }
    }
}

/// Rendered outbound envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub status: u16,
    pub code: i32,
    pub message: String,
    /// Generated resource id. Present (and empty) on 201 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Maps outcomes to client-visible statuses.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    success_message: String,
}

impl ResponseClassifier {
    pub fn new(success_message: impl Into<String>) -> Self {
        Self {
            success_message: success_message.into(),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.success_message.clone())
    }

    /// Classify an outcome.
    pub fn classify(&self, outcome: &DispatchOutcome) -> ErrorClassification {
        match outcome {
            DispatchOutcome::NodeNotFound { service } => ErrorClassification::new(
                503,
                codes::AVAILABLE_SERVICE_NOT_EXIST,
                format!("available {} service node does not exist in registry", service),
            ),
            DispatchOutcome::ResolutionFailed { detail, .. } => ErrorClassification::new(
                500,
                0,
                format!("unable to get service node from registry, err: {}", detail),
            ),
            DispatchOutcome::BreakerOpen { node_id, cool_down } => ErrorClassification::new(
                503,
                codes::CIRCUIT_BREAKER_OPEN,
                format!(
                    "circuit breaker is open (service id: {}, time out: {:?})",
                    node_id, cool_down
                ),
            ),
            DispatchOutcome::BreakerBusy { node_id } => ErrorClassification::new(
                503,
                codes::CIRCUIT_BREAKER_OPEN,
                format!(
                    "circuit breaker is half-open and trial calls are in progress (service id: {})",
                    node_id
                ),
            ),
            DispatchOutcome::Transport { operation, error } if error.is_timeout() => ErrorClassification::new(
                408,
                0,
                format!("request time out for {} service, detail: {}", operation, error.detail()),
            ),
            DispatchOutcome::Transport { operation, error } => ErrorClassification::new(
                500,
                0,
                format!("{} returns unexpected transport error, detail: {}", operation, error),
            ),
            DispatchOutcome::Backend { response, .. } if response.status == 201 => {
                ErrorClassification::new(201, 0, self.success_message.clone())
            }
            DispatchOutcome::Backend { response, .. } => {
                // HTTP cannot carry a status outside this range.
                let status = if (100..=599).contains(&response.status) {
                    response.status
                } else {
                    500
                };
                ErrorClassification::new(status, response.code, response.message.clone())
            }
        }
    }

    /// Classify and build the outbound envelope.
    pub fn render(&self, outcome: &DispatchOutcome) -> GatewayResponse {
        let classification = self.classify(outcome);
        let (uuid, body) = match outcome {
            // The backend's generated id is not propagated.
            DispatchOutcome::Backend { response, .. } if response.status == 201 => (Some(String::new()), None),
            DispatchOutcome::Backend { response, .. } => (None, response.body.clone()),
            _ => (None, None),
        };

        GatewayResponse {
            status: classification.http_status,
            code: classification.code,
            message: classification.message,
            uuid,
            body,
        }
    }
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}
