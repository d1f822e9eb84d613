//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_sync_notifications_total` (counter): decoded notifications by command
//! - `gateway_sync_notifications_dropped_total` (counter): malformed/unknown messages
//! - `gateway_sync_reloads_total` (counter): reload executions by outcome
//! - `gateway_sync_reload_duration_seconds` (histogram): fetch-and-swap latency
//! - `gateway_sync_config_entries` (gauge): entries in the current generation
//! - `gateway_sync_config_generation` (gauge): current generation number
//! - `gateway_sync_registered` (gauge): 1=registered, 0=unregistered
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_notification(command: &'static str) {
    counter!("gateway_sync_notifications_total", "command" => command).increment(1);
}

pub fn record_notification_dropped() {
    counter!("gateway_sync_notifications_dropped_total").increment(1);
}

pub fn record_reload(outcome: &'static str, started: Instant) {
    counter!("gateway_sync_reloads_total", "outcome" => outcome).increment(1);
    histogram!("gateway_sync_reload_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_generation(number: u64, entries: usize) {
    gauge!("gateway_sync_config_generation").set(number as f64);
    gauge!("gateway_sync_config_entries").set(entries as f64);
}

pub fn record_registered(registered: bool) {
    gauge!("gateway_sync_registered").set(if registered { 1.0 } else { 0.0 });
}
