//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers never see a changed threshold
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AdminConfig;
pub use schema::BackendConfig;
pub use schema::BreakerConfig;
pub use schema::DispatchConfig;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::NodeConfig;
pub use schema::ObservabilityConfig;
pub use schema::RegistryConfig;
pub use schema::RegistryKind;
pub use schema::ServiceConfig;
