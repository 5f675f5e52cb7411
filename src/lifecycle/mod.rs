//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     GatewayConfig → resolver + reporter → breakers → reconciler → backend → Dispatcher
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → listeners stop accepting → in-flight requests drain
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Pending recovery timers are not awaited on exit

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Components, StartupError};
