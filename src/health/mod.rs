//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! Breaker rejects a call (resilience/)
//!     → reconciler.rs
//!         → HealthReporter::mark_failing (now, awaited, bounded)
//!         → spawn timer: sleep(cool_down) → HealthReporter::mark_passing
//!
//! HealthReporter implementations:
//!     → table.rs (in-process TTL checks, read by the static resolver)
//!     → discovery/consul.rs (Consul agent TTL checks)
//! ```
//!
//! # Design Decisions
//! - Reporting is best-effort: failures are logged, never returned to a request
//! - The registry's view and the breaker's half-open timer are independent
//!   state machines over the same cool-down window
//! - Recovery timers are not cancelled when a breaker reopens; the last one
//!   to fire wins

pub mod reconciler;
pub mod table;

use async_trait::async_trait;
use thiserror::Error;

pub use reconciler::HealthReconciler;
pub use table::{CheckStatus, HealthTable};

/// Errors returned by a health-check system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    /// The referenced check does not exist.
    #[error("health check '{0}' is not registered")]
    UnknownCheck(String),

    /// The health-check agent could not be reached or refused the update.
    #[error("health agent request failed: {0}")]
    Agent(String),
}

/// External health-check system that decides node eligibility for everyone
/// else (load balancers, orchestrators, other gateways).
#[async_trait]
pub trait HealthReporter: Send + Sync {
    async fn mark_failing(&self, check_ref: &str, reason: &str) -> Result<(), HealthError>;

    async fn mark_passing(&self, check_ref: &str, reason: &str) -> Result<(), HealthError>;
}
