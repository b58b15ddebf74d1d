//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, invocation latency)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-function and per-rule outcomes
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by function, selected rule, status
//! - `gateway_invocation_duration_seconds` (histogram): handler latency by function
//! - `gateway_routes_registered` (gauge): routes mounted at startup
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The exporter is opt-in through `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_counter!(
        "gateway_requests_total",
        "Requests served by function, selected response rule and status"
    );
    describe_histogram!(
        "gateway_invocation_duration_seconds",
        "Handler invocation latency in seconds"
    );
    describe_gauge!("gateway_routes_registered", "Routes mounted at startup");
}

/// Record one served request.
pub fn record_invocation(function: &str, rule: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "function" => function.to_string(),
        "rule" => rule.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_invocation_duration_seconds",
        "function" => function.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the number of mounted routes.
pub fn record_routes(count: usize) {
    gauge!("gateway_routes_registered").set(count as f64);
}
