//! Consul agent client.
//!
//! # Responsibilities
//! - Resolve passing service instances through `/v1/health/service/{name}`
//! - Report TTL check state through `/v1/agent/check/{fail,pass}/{id}`
//!
//! # Design Decisions
//! - Only `passing=true` entries are candidates; Consul does the health filtering
//! - Check id comes from the service's `CheckID` meta, else Consul's
//!   default `service:{id}`
//! - Service address falls back to the node address when unset

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::discovery::{NodeResolver, ResolveError, ServiceNode};
use crate::health::{HealthError, HealthReporter};

/// One entry of the Consul health API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthEntry {
    pub node: AgentNode,
    pub service: AgentService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentNode {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub meta: Option<HashMap<String, String>>,
}

impl HealthEntry {
    /// Convert to the gateway's node snapshot.
    pub fn into_node(self) -> ServiceNode {
        let host = if self.service.address.is_empty() {
            self.node.address
        } else {
            self.service.address
        };
        let check = self
            .service
            .meta
            .as_ref()
            .and_then(|meta| meta.get("CheckID"))
            .cloned()
            .unwrap_or_else(|| format!("service:{}", self.service.id));

        ServiceNode {
            address: format!("{}:{}", host, self.service.port),
            id: self.service.id,
            health_check_ref: check,
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent address: {0}")]
    Address(#[from] url::ParseError),

    #[error("failed to build agent client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP client for a local Consul agent.
#[derive(Debug)]
pub struct ConsulAgent {
    client: reqwest::Client,
    base: Url,
    counters: DashMap<String, usize>,
}

impl ConsulAgent {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, AgentError> {
        let base = Url::parse(address)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            counters: DashMap::new(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn next_index(&self, service: &str, len: usize) -> usize {
        let mut counter = self.counters.entry(service.to_string()).or_insert(0);
        let index = *counter % len;
        *counter = counter.wrapping_add(1);
        index
    }

    async fn update_check(&self, action: &str, check_ref: &str, note: &str) -> Result<(), HealthError> {
        let mut url = self.endpoint(&["v1", "agent", "check", action, check_ref]);
        url.query_pairs_mut().append_pair("note", note);

        let response = self
            .client
            .put(url)
            .send()
            .await
            .map_err(|e| HealthError::Agent(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(HealthError::UnknownCheck(check_ref.to_string())),
            status => Err(HealthError::Agent(format!("unexpected status {}", status))),
        }
    }
}

#[async_trait]
impl NodeResolver for ConsulAgent {
    async fn resolve(&self, service: &str) -> Result<ServiceNode, ResolveError> {
        let mut url = self.endpoint(&["v1", "health", "service", service]);
        url.query_pairs_mut().append_pair("passing", "true");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolveError::Failed(format!("consul agent request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ResolveError::Failed(format!(
                "consul agent returned status {}",
                response.status()
            )));
        }

        let entries: Vec<HealthEntry> = response
            .json()
            .await
            .map_err(|e| ResolveError::Failed(format!("malformed consul response: {}", e)))?;

        if entries.is_empty() {
            return Err(ResolveError::NotFound(service.to_string()));
        }

        let index = self.next_index(service, entries.len());
        entries
            .into_iter()
            .nth(index)
            .map(HealthEntry::into_node)
            .ok_or_else(|| ResolveError::NotFound(service.to_string()))
    }
}

#[async_trait]
impl HealthReporter for ConsulAgent {
    async fn mark_failing(&self, check_ref: &str, reason: &str) -> Result<(), HealthError> {
        self.update_check("fail", check_ref, reason).await
    }

    async fn mark_passing(&self, check_ref: &str, reason: &str) -> Result<(), HealthError> {
        self.update_check("pass", check_ref, reason).await
    }
}
