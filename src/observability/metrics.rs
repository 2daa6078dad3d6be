//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, tier
//! - `gateway_request_duration_seconds` (histogram): latency by tier
//! - `gateway_cors_rejections_total` (counter): origins refused CORS
//! - `gateway_sessions_created_total` (counter): sessions persisted for the first time
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request. `tier` is the route binding name or the
/// fallback outcome that served it.
pub fn record_request(method: &str, status: u16, tier: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "tier" => tier.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "tier" => tier.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cors_rejected() {
    metrics::counter!("gateway_cors_rejections_total").increment(1);
}

pub fn record_session_created() {
    metrics::counter!("gateway_sessions_created_total").increment(1);
}
