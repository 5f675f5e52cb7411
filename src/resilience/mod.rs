//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend node:
//!     → registry.rs (look up or lazily create the node's breaker)
//!     → breaker.rs (admit or reject, run the call, record the outcome)
//!     → On rejection: health reconciler reports the node (see health/)
//! ```
//!
//! # Design Decisions
//! - Per-node circuit breaker (not global, not per-service)
//! - Fail fast in Open state (no waiting for timeout)
//! - No retries at this layer; one attempt per request
//! - Backend timeouts belong to the transport (see backend/)

pub mod breaker;
pub mod registry;

pub use breaker::{Breaker, BreakerError, BreakerSnapshot, BreakerState};
pub use registry::BreakerRegistry;
