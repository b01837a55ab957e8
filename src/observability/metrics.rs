//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define engine metrics (host status, table capacity, service state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `hoststate_host_up` (gauge): 1=up, 0=down or unknown, per host
//! - `hoststate_host_status_changes_total` (counter): status reports applied, per table
//! - `hoststate_table_up_hosts` (gauge): hosts up, per table
//! - `hoststate_service_state` (gauge): 0=down, 1=primary, 2=backup
//! - `hoststate_filter_operations_total` (counter): packet-filter calls by operation
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::model::ServiceState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| e.to_string())?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_host_status(host: &str, table: &str, up: bool) {
    metrics::gauge!("hoststate_host_up", "host" => host.to_string(), "table" => table.to_string())
        .set(if up { 1.0 } else { 0.0 });
    metrics::counter!("hoststate_host_status_changes_total", "table" => table.to_string()).increment(1);
}

pub fn record_table_up(table: &str, up: usize) {
    metrics::gauge!("hoststate_table_up_hosts", "table" => table.to_string()).set(up as f64);
}

pub fn record_service_state(service: &str, state: ServiceState) {
    let value = match state {
        ServiceState::Down => 0.0,
        ServiceState::Primary => 1.0,
        ServiceState::Backup => 2.0,
    };
    metrics::gauge!("hoststate_service_state", "service" => service.to_string()).set(value);
}

pub fn record_filter_op(op: &'static str) {
    metrics::counter!("hoststate_filter_operations_total", "operation" => op).increment(1);
}
