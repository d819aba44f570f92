//! Metrics collection and exposition.
//!
//! # Metrics
//! - `registry_pushes_total` (counter): pushes by graph ref and outcome
//! - `registry_checks_total` (counter): checks by graph ref and outcome
//! - `registry_publish_retries_total` (counter): snapshot publish retries
//! - `gateway_poll_failures_total` (counter): failed reconciliation passes
//! - `gateway_config_swaps_total` (counter): adopted snapshots
//! - `gateway_active_config_version` (gauge): currently active version
//!
//! # Design Decisions
//! - Low-overhead updates through the `metrics` facade; recording is a
//!   no-op until an exporter is installed
//! - Labels carry graph ref and outcome, never schema contents

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::registry::GraphRef;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

pub fn record_push(graph_ref: &GraphRef, published: bool) {
    let outcome = if published { "published" } else { "composition_failed" };
    counter!(
        "registry_pushes_total",
        "graph_ref" => graph_ref.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_check(graph_ref: &GraphRef, outcome: &'static str) {
    counter!(
        "registry_checks_total",
        "graph_ref" => graph_ref.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_publish_retry(graph_ref: &GraphRef) {
    counter!(
        "registry_publish_retries_total",
        "graph_ref" => graph_ref.to_string()
    )
    .increment(1);
}

pub fn record_poll_failure(graph_ref: &GraphRef) {
    counter!(
        "gateway_poll_failures_total",
        "graph_ref" => graph_ref.to_string()
    )
    .increment(1);
}

pub fn record_config_swap(graph_ref: &GraphRef, version: u64) {
    counter!(
        "gateway_config_swaps_total",
        "graph_ref" => graph_ref.to_string()
    )
    .increment(1);
    gauge!(
        "gateway_active_config_version",
        "graph_ref" => graph_ref.to_string()
    )
    .set(version as f64);
}
