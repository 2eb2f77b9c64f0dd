//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_auth_attempts_total` (counter): by mechanism, outcome
//! - `gateway_tokens_total` (counter): token lifecycle events
//! - `gateway_tokens_live` (gauge): tokens currently held
//! - `gateway_interceptor_failures_total` (counter): by interceptor

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// `outcome` is `authenticated` or `failed`.
pub fn record_auth_attempt(mechanism: &str, outcome: &'static str) {
    counter!(
        "gateway_auth_attempts_total",
        "mechanism" => mechanism.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_token_event(event: &'static str) {
    record_token_events(event, 1);
}

pub fn record_token_events(event: &'static str, count: u64) {
    counter!("gateway_tokens_total", "event" => event).increment(count);
}

pub fn record_live_tokens(count: usize) {
    gauge!("gateway_tokens_live").set(count as f64);
}

pub fn record_interceptor_failure(interceptor: &str) {
    counter!(
        "gateway_interceptor_failures_total",
        "interceptor" => interceptor.to_string()
    )
    .increment(1);
}
