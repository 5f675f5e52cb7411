//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TcpListener
//!     → server.rs (axum Router, tower-http layers)
//!     → request.rs (Correlation from headers)
//!     → Dispatcher::handle on a spawned task
//!     → response.rs (GatewayResponse → JSON with its status)
//! ```
//!
//! # Design Decisions
//! - Request ids are set before tracing so every span carries one
//! - The dispatch task outlives a disconnected client

pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
