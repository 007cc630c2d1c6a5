//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method and status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_failovers_total` (counter): transport failures by backend
//! - `proxy_backend_alive` (gauge): 1=alive, 0=down

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::load_balancer::Backend;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished inbound request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a forwarding failure that triggered failover.
pub fn record_failover(backend: &Backend) {
    counter!("proxy_failovers_total", "backend" => backend.to_string()).increment(1);
}

/// Record the current liveness of a backend.
pub fn record_backend_alive(backend: &Backend, alive: bool) {
    gauge!("proxy_backend_alive", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}
