//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! InboundOperation + Correlation
//!     → NodeResolver::resolve(service)
//!     → BreakerRegistry::get_or_create(node.id)
//!     → Breaker::run(BackendClient::invoke)
//!         - Open: HealthReconciler::on_breaker_open, BreakerOpen
//!         - Busy (half-open, no trial slot): BreakerBusy, no health signal
//!     → ResponseClassifier::render(outcome)
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use tracing::Instrument;

use crate::backend::BackendClient;
use crate::discovery::{NodeResolver, ResolveError, ServiceNode};
use crate::dispatch::classify::{GatewayResponse, ResponseClassifier};
use crate::dispatch::correlation::Correlation;
use crate::dispatch::outcome::DispatchOutcome;
use crate::health::HealthReconciler;
use crate::observability::metrics;
use crate::resilience::{BreakerError, BreakerRegistry};

/// A client request addressed to `service`/`operation`.
#[derive(Debug, Clone)]
pub struct InboundOperation {
    pub service: String,
    pub operation: String,
    pub payload: Value,
}

/// Routes operations to backend nodes through per-node breakers.
pub struct Dispatcher {
    resolver: Arc<dyn NodeResolver>,
    breakers: Arc<BreakerRegistry>,
    reconciler: HealthReconciler,
    backend: Arc<dyn BackendClient>,
    classifier: ResponseClassifier,
}

impl Dispatcher {
    pub fn new(
        resolver: Arc<dyn NodeResolver>,
        breakers: Arc<BreakerRegistry>,
        reconciler: HealthReconciler,
        backend: Arc<dyn BackendClient>,
        classifier: ResponseClassifier,
    ) -> Self {
        Self {
            resolver,
            breakers,
            reconciler,
            backend,
            classifier,
        }
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    /// Resolve, dispatch, classify and render one inbound operation.
    pub async fn handle(&self, inbound: InboundOperation, correlation: &Correlation) -> GatewayResponse {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %correlation.request_id,
            trace_id = %correlation.trace_context.trace_id,
            service = %inbound.service,
            operation = %inbound.operation,
        );

        async move {
            let started = Instant::now();

            let outcome = match self.resolver.resolve(&inbound.service).await {
                Ok(node) => {
                    tracing::debug!(node_id = %node.id, address = %node.address, "Selected service node");
                    self.dispatch(&inbound.operation, &node, &inbound.payload, correlation)
                        .await
                }
                Err(ResolveError::NotFound(service)) => DispatchOutcome::NodeNotFound { service },
                Err(ResolveError::Failed(detail)) => DispatchOutcome::ResolutionFailed {
                    service: inbound.service.clone(),
                    detail,
                },
            };

            let response = self.classifier.render(&outcome);
            log_outcome(&outcome, &response);
            metrics::record_request(response.status, outcome.kind(), started.elapsed());
            response
        }
        .instrument(span)
        .await
    }

    /// Invoke `operation` on `node` under its circuit breaker.
    ///
    /// No retries. A call rejected by an open breaker signals the health-check
    /// system before returning; a half-open breaker that is only busy does not.
    pub async fn dispatch(
        &self,
        operation: &str,
        node: &ServiceNode,
        payload: &Value,
        correlation: &Correlation,
    ) -> DispatchOutcome {
        let breaker = self.breakers.get_or_create(&node.id);
        let hop = correlation.child();

        let span = tracing::debug_span!(
            "backend_call",
            node_id = %node.id,
            address = %node.address,
            span_id = %hop.trace_context.span_id,
        );
        let result = breaker
            .run(|| self.backend.invoke(operation, &node.address, payload, &hop))
            .instrument(span)
            .await;

        match result {
            Ok(response) => DispatchOutcome::Backend {
                operation: operation.to_string(),
                response,
            },
            Err(BreakerError::Open) => {
                let cool_down = breaker.cool_down();
                metrics::record_breaker_rejection(&node.id);
                // The recovery task runs on its own.
                let _recovery = self.reconciler.on_breaker_open(node, cool_down).await;
                DispatchOutcome::BreakerOpen {
                    node_id: node.id.clone(),
                    cool_down,
                }
            }
            Err(BreakerError::Busy) => {
                metrics::record_breaker_rejection(&node.id);
                DispatchOutcome::BreakerBusy {
                    node_id: node.id.clone(),
                }
            }
            Err(BreakerError::Call(error)) => DispatchOutcome::Transport {
                operation: operation.to_string(),
                error,
            },
        }
    }
}

fn log_outcome(outcome: &DispatchOutcome, response: &GatewayResponse) {
    if outcome.is_failure() {
        tracing::error!(
            outcome = outcome.kind(),
            status = response.status,
            code = response.code,
            message = %response.message,
            "Dispatch failed"
        );
    } else {
        tracing::info!(
            outcome = outcome.kind(),
            status = response.status,
            code = response.code,
            "Dispatch completed"
        );
    }
}
