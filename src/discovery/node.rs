//! Service node snapshot.

use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;

/// A single addressable backend instance, as returned by a resolver.
///
/// Immutable and fetched fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    /// Registry-unique node identifier; keys the node's circuit breaker.
    pub id: String,
    /// `host:port` the backend listens on.
    pub address: String,
    /// Health check this node reports into.
    pub health_check_ref: String,
}

impl ServiceNode {
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        health_check_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            health_check_ref: health_check_ref.into(),
        }
    }
}

impl From<&NodeConfig> for ServiceNode {
    fn from(config: &NodeConfig) -> Self {
        Self {
            id: config.id.clone(),
            address: config.address.clone(),
            health_check_ref: config.check_ref(),
        }
    }
}
