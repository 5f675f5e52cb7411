//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the node resolver and health reporter for the configured registry
//! - Create the breaker registry, reconciler and backend client
//! - Assemble the [`Dispatcher`]

use std::sync::Arc;

use thiserror::Error;

use crate::backend::HttpBackendClient;
use crate::config::{GatewayConfig, RegistryKind};
use crate::discovery::{AgentError, ConsulAgent, NodeResolver, StaticResolver};
use crate::dispatch::{Dispatcher, ResponseClassifier};
use crate::health::{HealthReconciler, HealthReporter, HealthTable};
use crate::resilience::BreakerRegistry;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to set up registry agent: {0}")]
    Registry(#[from] AgentError),

    #[error("failed to build backend client: {0}")]
    Backend(#[from] reqwest::Error),
}

/// Wired runtime components.
pub struct Components {
    pub dispatcher: Arc<Dispatcher>,
    pub breakers: Arc<BreakerRegistry>,
    /// Local check table; only present with the static registry.
    pub health: Option<Arc<HealthTable>>,
}

impl Components {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, StartupError> {
        let (resolver, reporter, health) = match config.registry.kind {
            RegistryKind::Static => {
                let table = Arc::new(HealthTable::new());
                let resolver: Arc<dyn NodeResolver> = Arc::new(StaticResolver::new(&config.services, table.clone()));
                let reporter: Arc<dyn HealthReporter> = table.clone();
                (resolver, reporter, Some(table))
            }
            RegistryKind::Consul => {
                let agent = Arc::new(ConsulAgent::new(
                    &config.registry.consul_address,
                    config.registry.report_timeout(),
                )?);
                tracing::info!(address = %config.registry.consul_address, "Using Consul registry");
                let resolver: Arc<dyn NodeResolver> = agent.clone();
                let reporter: Arc<dyn HealthReporter> = agent;
                (resolver, reporter, None)
            }
        };

        let breakers = Arc::new(BreakerRegistry::new(config.breaker.clone()));
        let reconciler = HealthReconciler::new(reporter, config.registry.report_timeout());
        let backend = Arc::new(HttpBackendClient::new(&config.backend)?);

        let dispatcher = Arc::new(Dispatcher::new(
            resolver,
            breakers.clone(),
            reconciler,
            backend,
            ResponseClassifier::from_config(&config.dispatch),
        ));

        tracing::info!(
            registry = ?config.registry.kind,
            error_threshold = config.breaker.error_threshold,
            success_threshold = config.breaker.success_threshold,
            cool_down_ms = config.breaker.cool_down_ms,
            "Dispatcher initialized"
        );

        Ok(Self {
            dispatcher,
            breakers,
            health,
        })
    }
}
