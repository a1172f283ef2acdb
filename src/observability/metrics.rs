//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_admissions_total` (counter): admission outcomes by `outcome`
//! - `guard_auto_blocks_total` (counter): clients auto-blocked
//! - `guard_manual_unblocks_total` (counter): operator unblocks
//! - `guard_evicted_clients_total` (counter): idle entries dropped
//! - `guard_tracked_clients` (gauge): distinct client ids in the store
//! - `guard_global_window_count` (gauge): global count in the current window
//!
//! Without an installed recorder every call here is a no-op, so unit tests
//! need no setup.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(outcome: &'static str) {
    counter!("guard_admissions_total", "outcome" => outcome).increment(1);
}

pub fn record_auto_block() {
    counter!("guard_auto_blocks_total").increment(1);
}

pub fn record_manual_unblock() {
    counter!("guard_manual_unblocks_total").increment(1);
}

pub fn record_evictions(count: usize) {
    counter!("guard_evicted_clients_total").increment(count as u64);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("guard_tracked_clients").set(count as f64);
}

pub fn record_global_count(count: u64) {
    gauge!("guard_global_window_count").set(count as f64);
}
