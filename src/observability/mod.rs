//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events and spans (request id, trace id per dispatch span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request id and trace id are span fields, so every event inherits them
//! - Metric calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
