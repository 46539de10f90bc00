//! Metrics collection and exposition.
//!
//! # Metrics
//! - `range_proxy_requests_total` (counter): requests by outcome, status
//! - `range_proxy_request_duration_seconds` (histogram): latency by outcome
//! - `range_proxy_cache_events_total` (counter): hit / miss / store
//! - `range_proxy_cache_entries` (gauge): current cache size
//! - `range_proxy_upstream_errors_total` (counter): transport failures by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   and tests pay nothing
//! - Padding line counts are never recorded

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "range_proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("range_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_event(event: &'static str) {
    counter!("range_proxy_cache_events_total", "event" => event).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("range_proxy_cache_entries").set(size as f64);
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("range_proxy_upstream_errors_total", "kind" => kind).increment(1);
}
