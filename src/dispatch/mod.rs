//! Dispatch core.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → dispatcher.rs (resolve node, run under breaker, reconcile on open)
//!     → outcome.rs (DispatchOutcome)
//!     → classify.rs (ErrorClassification, GatewayResponse)
//! ```
//!
//! # Design Decisions
//! - Every failure is an outcome value, never a panic or early return
//! - Classification is pure; logging and metrics happen once per request
//! - Correlation is passed explicitly, not through task-locals

pub mod classify;
pub mod correlation;
pub mod dispatcher;
pub mod outcome;

pub use classify::{codes, ErrorClassification, GatewayResponse, ResponseClassifier};
pub use correlation::{Correlation, TraceContext};
pub use dispatcher::{Dispatcher, InboundOperation};
pub use outcome::DispatchOutcome;
