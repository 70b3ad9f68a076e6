//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status
//! - `edge_request_duration_seconds` (histogram): latency distribution
//! - `edge_resolution_cache_total` (counter): lookups by result
//! - `edge_response_cache_total` (counter): lookups by result
//!
//! # Design Decisions
//! - Low-overhead updates; label cardinality kept to method/status/result
//! - Prometheus exposition on a separate listener so the data plane and
//!   the scrape path never share a port

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start the exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint started");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "edge_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("edge_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Record a resolution cache lookup result ("hit" / "miss").
pub fn record_resolution_cache(result: &'static str) {
    counter!("edge_resolution_cache_total", "result" => result).increment(1);
}

/// Record a response cache outcome ("hit" / "miss" / "bypass" /
/// "revalidated").
pub fn record_response_cache(result: &'static str) {
    counter!("edge_response_cache_total", "result" => result).increment(1);
}
