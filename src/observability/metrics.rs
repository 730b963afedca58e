//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_reconcile_apply_total` (counter): mutations by `path`, `result`
//! - `lb_reconcile_apply_duration_seconds` (histogram): end-to-end `apply`
//! - `lb_reconcile_validation_total` (counter): checker verdicts by `result`
//! - `lb_reconcile_reload_total` (counter): reloads by `result`
//! - `lb_reconcile_runtime_errors_total` (counter): socket failures by `kind`
//!
//! # Design Decisions
//! - Labels are small closed sets, never server or backend names

use std::net::SocketAddr;
use std::time::Duration;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::model::PathUsed;

pub const APPLY_TOTAL: &str = "lb_reconcile_apply_total";
pub const APPLY_DURATION: &str = "lb_reconcile_apply_duration_seconds";
pub const VALIDATION_TOTAL: &str = "lb_reconcile_validation_total";
pub const RELOAD_TOTAL: &str = "lb_reconcile_reload_total";
pub const RUNTIME_ERRORS_TOTAL: &str = "lb_reconcile_runtime_errors_total";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn result_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

pub fn record_apply(path: PathUsed, success: bool, elapsed: Duration) {
    counter!(APPLY_TOTAL, "path" => path.as_str(), "result" => result_label(success)).increment(1);
    histogram!(APPLY_DURATION).record(elapsed.as_secs_f64());
}

pub fn record_validation(valid: bool) {
    let result = if valid { "valid" } else { "invalid" };
    counter!(VALIDATION_TOTAL, "result" => result).increment(1);
}

pub fn record_reload(success: bool) {
    counter!(RELOAD_TOTAL, "result" => result_label(success)).increment(1);
}

pub fn record_runtime_error(kind: &'static str) {
    counter!(RUNTIME_ERRORS_TOTAL, "kind" => kind).increment(1);
}
