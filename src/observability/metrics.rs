//! Metrics collection.
//!
//! # Metrics
//! - `pipeline_attempts_total` (counter): transport invocations made by the retry engine
//! - `pipeline_retries_total` (counter): retries scheduled, by reason
//! - `pipeline_retries_exhausted_total` (counter): calls that ran out of attempts
//! - `pipeline_connected` (gauge): 1=connected, 0=disconnected
//! - `pipeline_connectivity_transitions_total` (counter): edges, by direction
//! - `pipeline_request_duration_seconds` (histogram): end-to-end call latency
//!
//! No exporter is installed here; without a global recorder every call is a no-op.

use std::time::Instant;

pub fn record_attempt() {
    metrics::counter!("pipeline_attempts_total").increment(1);
}

pub fn record_retry(reason: &str) {
    metrics::counter!("pipeline_retries_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_exhausted() {
    metrics::counter!("pipeline_retries_exhausted_total").increment(1);
}

pub fn record_connectivity(connected: bool) {
    metrics::gauge!("pipeline_connected").set(if connected { 1.0 } else { 0.0 });
    let direction = if connected { "reconnect" } else { "disconnect" };
    metrics::counter!("pipeline_connectivity_transitions_total", "direction" => direction)
        .increment(1);
}

pub fn record_request_duration(method: &str, status: Option<u16>, start: Instant) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    metrics::histogram!(
        "pipeline_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}
