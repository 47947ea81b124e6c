//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_breaker_transitions_total` (counter): state transitions by key, new state
//! - `rpc_breaker_state` (gauge): 0=unknown, 1=closed, 2=half open, 3=open
//! - `rpc_breaker_shed_total` (counter): calls shed by key
//! - `rpc_breaker_stale_outcomes_total` (counter): outcomes dropped for a stale generation
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; it is a no-op until an exporter is installed
//! - Labels are the breaker key, never the call identifier

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::breaker::State;
use crate::registry::Key;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_transition(key: &Key, state: State) {
    metrics::counter!(
        "rpc_breaker_transitions_total",
        "key" => key.to_string(),
        "state" => state.as_str()
    )
    .increment(1);
    metrics::gauge!("rpc_breaker_state", "key" => key.to_string()).set(state as u8 as f64);
}

pub fn record_shed(key: &Key) {
    metrics::counter!("rpc_breaker_shed_total", "key" => key.to_string()).increment(1);
}

pub fn record_stale_outcome(key: &Key) {
    metrics::counter!("rpc_breaker_stale_outcomes_total", "key" => key.to_string()).increment(1);
}
