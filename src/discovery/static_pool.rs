//! Statically configured node pools.
//!
//! # Responsibilities
//! - Group configured nodes by service name
//! - Rotate through nodes round-robin
//! - Skip nodes whose health check is currently failing

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ServiceConfig;
use crate::discovery::{NodeResolver, ResolveError, ServiceNode};
use crate::health::HealthTable;

#[derive(Debug)]
struct Pool {
    nodes: Vec<ServiceNode>,
    counter: AtomicUsize,
}

/// Resolver over nodes listed in the configuration file.
#[derive(Debug)]
pub struct StaticResolver {
    pools: HashMap<String, Pool>,
    health: Arc<HealthTable>,
}

impl StaticResolver {
    /// Build pools from configuration and register every node's check.
    pub fn new(services: &[ServiceConfig], health: Arc<HealthTable>) -> Self {
        let mut pools = HashMap::new();
        for service in services {
            let nodes: Vec<ServiceNode> = service.nodes.iter().map(ServiceNode::from).collect();
            for node in &nodes {
                health.register(&node.health_check_ref);
            }
            tracing::info!(service = %service.name, nodes = nodes.len(), "Registered static service");
            pools.insert(
                service.name.clone(),
                Pool {
                    nodes,
                    counter: AtomicUsize::new(0),
                },
            );
        }

        Self { pools, health }
    }
}

#[async_trait]
impl NodeResolver for StaticResolver {
    async fn resolve(&self, service: &str) -> Result<ServiceNode, ResolveError> {
        let Some(pool) = self.pools.get(service) else {
            tracing::debug!(service = %service, "Service not found in static pool");
            return Err(ResolveError::NotFound(service.to_string()));
        };

        let len = pool.nodes.len();
        if len == 0 {
            return Err(ResolveError::NotFound(service.to_string()));
        }

        let start = pool.counter.fetch_add(1, Ordering::Relaxed);
        for i in 0..len {
            let node = &pool.nodes[(start + i) % len];
            if self.health.is_passing(&node.health_check_ref) {
                return Ok(node.clone());
            }
        }

        tracing::debug!(service = %service, node_count = len, "No passing nodes found in pool");
        Err(ResolveError::NotFound(service.to_string()))
    }
}
