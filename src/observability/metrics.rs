//! Metrics collection and exposition.
//!
//! # Metrics
//! - `driver_transactions_submitted_total` (counter): broadcasts by operation
//! - `driver_gas_estimation_fallback_total` (counter): fallbacks by reason
//! - `driver_receipts_total` (counter): receipts by status
//!
//! # Design Decisions
//! - Counters are no-ops until a recorder is installed; the binary installs
//!   the Prometheus exporter only when `observability.metrics_enabled` is set
//! - Label values are static strings

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must run inside a tokio runtime; the listener lives as long as the runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install metrics exporter on {}: {}", addr, e))
}

pub fn record_transaction_submitted(operation: &'static str) {
    counter!("driver_transactions_submitted_total", "operation" => operation).increment(1);
}

pub fn record_gas_fallback(reason: &'static str) {
    counter!("driver_gas_estimation_fallback_total", "reason" => reason).increment(1);
}

pub fn record_receipt(status: &'static str) {
    counter!("driver_receipts_total", "status" => status).increment(1);
}
