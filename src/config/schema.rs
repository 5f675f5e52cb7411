//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatch gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Per-node circuit breaker settings, shared by every breaker.
    pub breaker: BreakerConfig,

    /// Service registry / health-check system settings.
    pub registry: RegistryConfig,

    /// Statically known services (used when `registry.kind = "static"`).
    pub services: Vec<ServiceConfig>,

    /// Backend RPC transport settings.
    pub backend: BackendConfig,

    /// Response rendering settings.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Circuit breaker configuration.
///
/// Loaded once at startup and shared read-only by all breakers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open a closed breaker.
    pub error_threshold: u32,

    /// Consecutive successful trials that close a half-open breaker.
    pub success_threshold: u32,

    /// How long an open breaker rejects calls, in milliseconds.
    pub cool_down_ms: u64,
}

impl BreakerConfig {
    /// Cool-down as a [`Duration`].
    pub fn cool_down(&self) -> Duration {
        Duration::from_millis(self.cool_down_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            success_threshold: 1,
            cool_down_ms: 5_000,
        }
    }
}

/// Which service registry backs node resolution and health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    /// Nodes come from `[[services]]`; health lives in an in-process table.
    Static,
    /// Nodes and TTL checks live in a Consul agent.
    Consul,
}

/// Service registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry implementation.
    pub kind: RegistryKind,

    /// Consul agent HTTP address.
    pub consul_address: String,

    /// Upper bound on a single health signal, in milliseconds.
    pub report_timeout_ms: u64,
}

impl RegistryConfig {
    pub fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.report_timeout_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::Static,
            consul_address: "http://127.0.0.1:8500".to_string(),
            report_timeout_ms: 2_000,
        }
    }
}

/// A logical backend service and its instances.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Logical service name used by inbound requests.
    pub name: String,

    /// Instances of this service.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// A single backend instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Unique node identifier.
    pub id: String,

    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Health check this node reports into (default: `service:{id}`).
    #[serde(default)]
    pub health_check_ref: Option<String>,
}

impl NodeConfig {
    /// Resolved health check reference.
    pub fn check_ref(&self) -> String {
        self.health_check_ref
            .clone()
            .unwrap_or_else(|| format!("service:{}", self.id))
    }
}

/// Backend RPC transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// URL scheme used to reach backends.
    pub scheme: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Whole-call timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 10_000,
        }
    }
}

/// Response rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Message rendered when the backend declares 201 Created.
    pub success_message: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            success_message: "succeed to create new schedule".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.breaker.error_threshold, 3);
        assert_eq!(config.breaker.cool_down(), Duration::from_secs(5));
        assert_eq!(config.registry.kind, RegistryKind::Static);
        assert_eq!(config.dispatch.success_message, "succeed to create new schedule");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [breaker]
            cool_down_ms = 250

            [[services]]
            name = "schedule"
            nodes = [{ id = "s1", address = "127.0.0.1:9001" }]
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.cool_down_ms, 250);
        assert_eq!(config.breaker.error_threshold, 3);
        assert_eq!(config.services[0].nodes[0].check_ref(), "service:s1");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
