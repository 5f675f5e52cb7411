//! Node discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound operation → service name
//!     → NodeResolver::resolve
//!         - static_pool.rs (configured nodes, skip failing checks, round robin)
//!         - consul.rs (agent health API, passing entries only, round robin)
//!     → ServiceNode or ResolveError
//! ```
//!
//! # Design Decisions
//! - Resolver is a trait so the dispatcher never knows which registry it talks to
//! - Nodes are resolved per request, never cached by the gateway
//! - Selection policy lives in the resolver, not the dispatcher

pub mod consul;
pub mod node;
pub mod static_pool;

use async_trait::async_trait;
use thiserror::Error;

pub use consul::{AgentError, ConsulAgent};
pub use node::ServiceNode;
pub use static_pool::StaticResolver;

/// Errors that can occur while resolving a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No healthy node is registered for the service.
    #[error("no available node for service '{0}'")]
    NotFound(String),

    /// The registry could not be queried.
    #[error("{0}")]
    Failed(String),
}

/// Source of candidate nodes for a logical service.
#[async_trait]
pub trait NodeResolver: Send + Sync {
    /// Return one healthy node for `service`.
    async fn resolve(&self, service: &str) -> Result<ServiceNode, ResolveError>;
}
