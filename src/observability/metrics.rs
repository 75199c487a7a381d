//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, handler kind
//! - `gateway_request_duration_seconds` (histogram): pipeline latency
//! - `gateway_cache_lookups_total` (counter): cache-aside hits and misses
//! - `gateway_cache_entries` (gauge): entries held by the in-memory cache
//! - `gateway_storage_fetches_total` (counter): storage calls by result
//! - `gateway_dispatch_outcomes_total` (counter): command outcomes by kind
//! - `gateway_pending_dispatches` (gauge): commands awaiting an outcome

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed pipeline request.
pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "kind" => kind
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gateway_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("gateway_cache_entries").set(entries as f64);
}

/// Record a storage call; `result` is one of `found`, `absent`, `error`.
pub fn record_storage_fetch(result: &'static str, start: Instant) {
    counter!("gateway_storage_fetches_total", "result" => result).increment(1);
    histogram!("gateway_storage_fetch_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_dispatch_outcome(kind: &'static str) {
    counter!("gateway_dispatch_outcomes_total", "outcome" => kind).increment(1);
}

pub fn record_pending_dispatches(pending: usize) {
    gauge!("gateway_pending_dispatches").set(pending as f64);
}
