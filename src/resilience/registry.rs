//! Per-node breaker registry.
//!
//! # Responsibilities
//! - Hand out the breaker belonging to a node id
//! - Create breakers lazily, exactly once per node id, under concurrent access
//!
//! # Design Decisions
//! - Entries are never evicted; the node population is bounded and slow-moving
//! - Read path takes a shard read lock; creation goes through `entry()`

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::breaker::{Breaker, BreakerSnapshot};

/// Concurrent node id → breaker map.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<Breaker>>,
    config: Arc<BreakerConfig>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config: Arc::new(config),
        }
    }

    /// Get the breaker for `node_id`, creating it on first sight.
    pub fn get_or_create(&self, node_id: &str) -> Arc<Breaker> {
        if let Some(existing) = self.breakers.get(node_id) {
            return existing.clone();
        }

        let breaker = self
            .breakers
            .entry(node_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(node_id = %node_id, "Creating circuit breaker");
                Arc::new(Breaker::new(node_id, self.config.clone()))
            })
            .clone();
        metrics::record_breaker_count(self.breakers.len());
        breaker
    }

    /// Number of breakers created so far.
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshot every breaker, sorted by node id.
    pub fn snapshot(&self) -> Vec<(String, BreakerSnapshot)> {
        let mut all: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
