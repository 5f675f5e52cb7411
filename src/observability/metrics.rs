//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by response status, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by outcome
//! - `gateway_breaker_rejections_total` (counter): open-breaker rejections by node
//! - `gateway_health_signals_total` (counter): health reports by signal, result
//! - `gateway_breakers` (gauge): breakers in the registry

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!("gateway_requests_total", "Dispatched requests");
    ::metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        ::metrics::Unit::Seconds,
        "End-to-end dispatch latency"
    );
    ::metrics::describe_counter!("gateway_breaker_rejections_total", "Calls rejected by an open breaker");
    ::metrics::describe_counter!("gateway_health_signals_total", "Health-check reports sent");
    ::metrics::describe_gauge!("gateway_breakers", "Breakers in the registry");

    tracing::info!(address = %addr, "Prometheus metrics endpoint on http://{}/metrics", addr);
    Ok(())
}

pub fn record_request(status: u16, outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!("gateway_requests_total", "status" => status.to_string(), "outcome" => outcome).increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub fn record_breaker_rejection(node_id: &str) {
    ::metrics::counter!("gateway_breaker_rejections_total", "node" => node_id.to_string()).increment(1);
}

pub fn record_health_signal(signal: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("gateway_health_signals_total", "signal" => signal, "result" => result).increment(1);
}

pub fn record_breaker_count(count: usize) {
    ::metrics::gauge!("gateway_breakers").set(count as f64);
}
