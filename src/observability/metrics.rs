//! Metrics collection and exposition.
//!
//! # Metrics
//! - `negotiate_requests_total` (counter): responses sent, by status
//! - `negotiate_request_duration_seconds` (histogram): authenticate + respond time
//! - `negotiate_auth_outcomes_total` (counter): by outcome label
//! - `negotiate_transport_errors_total` (counter): by stage (receive, send)
//! - `negotiate_queue_rejections_total` (counter): by reason (full, closed)
//! - `negotiate_service_paused` (gauge): 1 while paused
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("negotiate_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("negotiate_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_auth_outcome(outcome: &'static str) {
    metrics::counter!("negotiate_auth_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_transport_error(stage: &'static str) {
    metrics::counter!("negotiate_transport_errors_total", "stage" => stage).increment(1);
}

pub fn record_queue_rejection(reason: &'static str) {
    metrics::counter!("negotiate_queue_rejections_total", "reason" => reason).increment(1);
}

pub fn set_paused(paused: bool) {
    metrics::gauge!("negotiate_service_paused").set(if paused { 1.0 } else { 0.0 });
}
