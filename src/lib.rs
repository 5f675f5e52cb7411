//! Service dispatch gateway library.
//!
//! Routes `POST /v1/{service}/{operation}` to a backend node chosen by a
//! registry, guarding each node with its own circuit breaker and reporting
//! breaker trips to the registry's health checks.

// Core subsystems
pub mod backend;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod http;

// Traffic management
pub mod health;
pub mod resilience;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use dispatch::{Dispatcher, GatewayResponse};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
