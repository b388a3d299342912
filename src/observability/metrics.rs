//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_backend_errors_total` (counter): failed backend calls
//! - `proxy_pool_resets_total` (counter): idle pool invalidations
//! - `proxy_active_connections` (gauge): open client connections
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_error() {
    ::metrics::counter!("proxy_backend_errors_total").increment(1);
}

pub fn record_pool_reset() {
    ::metrics::counter!("proxy_pool_resets_total").increment(1);
}

pub fn connection_opened() {
    ::metrics::gauge!("proxy_active_connections").increment(1.0);
}

pub fn connection_closed() {
    ::metrics::gauge!("proxy_active_connections").decrement(1.0);
}
