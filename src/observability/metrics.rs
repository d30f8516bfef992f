//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_cache_events_total` (counter): hit / miss / bypass / store / store_error / lookup_error
//! - `gateway_faults_total` (counter): downstream faults by route and kind
//! - `gateway_route_table_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no recorder
//!   installed the calls are no-ops
//! - Unmatched requests are labelled `route="none"` to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, outcome: &str, start: Instant) {
    let route = route.to_string();
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.clone(),
        "status" => status.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route).record(start.elapsed().as_secs_f64());
}

pub fn record_cache_event(event: &'static str) {
    metrics::counter!("gateway_cache_events_total", "event" => event).increment(1);
}

pub fn record_fault(route: &str, kind: &'static str) {
    metrics::counter!("gateway_faults_total", "route" => route.to_string(), "kind" => kind).increment(1);
}

pub fn record_reload(result: &'static str) {
    metrics::counter!("gateway_route_table_reloads_total", "result" => result).increment(1);
}
