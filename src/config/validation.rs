//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (node ids unique across services)
//! - Validate value ranges (thresholds > 0, timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RegistryKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: '{value}'")]
    BadSocketAddr { field: &'static str, value: String },

    #[error("registry.consul_address is not a valid URL: '{0}'")]
    BadConsulAddress(String),

    #[error("duplicate service name '{0}'")]
    DuplicateService(String),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("node '{0}' has an empty address")]
    EmptyAddress(String),

    #[error("backend.scheme must be http or https, got '{0}'")]
    BadScheme(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nonzero: [(&'static str, u64); 6] = [
        ("breaker.error_threshold", config.breaker.error_threshold.into()),
        ("breaker.success_threshold", config.breaker.success_threshold.into()),
        ("breaker.cool_down_ms", config.breaker.cool_down_ms),
        ("registry.report_timeout_ms", config.registry.report_timeout_ms),
        ("backend.connect_timeout_ms", config.backend.connect_timeout_ms),
        ("backend.request_timeout_ms", config.backend.request_timeout_ms),
    ];
    for (field, value) in nonzero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_size" });
    }

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_socket_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if !matches!(config.backend.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::BadScheme(config.backend.scheme.clone()));
    }

    if config.registry.kind == RegistryKind::Consul
        && url::Url::parse(&config.registry.consul_address).is_err()
    {
        errors.push(ValidationError::BadConsulAddress(config.registry.consul_address.clone()));
    }

    let mut services = HashSet::new();
    let mut nodes = HashSet::new();
    for service in &config.services {
        if !services.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        for node in &service.nodes {
            if !nodes.insert(node.id.as_str()) {
                errors.push(ValidationError::DuplicateNode(node.id.clone()));
            }
            if node.address.trim().is_empty() {
                errors.push(ValidationError::EmptyAddress(node.id.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadSocketAddr {
            field,
            value: value.to_string(),
        });
    }
}
