//! Prometheus metrics.
//!
//! The recorder is only installed when a listen address is configured;
//! until then the `metrics` macros are no-ops.

use std::{net::SocketAddr, time::Duration};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

pub const WORKFLOW_REQUESTS_TOTAL: &str = "mmchat_workflow_requests_total";
pub const WORKFLOW_DURATION_SECONDS: &str = "mmchat_workflow_duration_seconds";
pub const GATEWAY_CALLS_TOTAL: &str = "mmchat_gateway_calls_total";

pub fn start_prometheus(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_counter!(
        WORKFLOW_REQUESTS_TOTAL,
        "Workflow runs by classified intent and outcome"
    );
    describe_histogram!(
        WORKFLOW_DURATION_SECONDS,
        "End-to-end workflow latency by classified intent"
    );
    describe_counter!(
        GATEWAY_CALLS_TOTAL,
        "Remote model calls by operation and outcome"
    );
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_workflow(intent: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!(WORKFLOW_REQUESTS_TOTAL, "intent" => intent, "outcome" => outcome).increment(1);
    histogram!(WORKFLOW_DURATION_SECONDS, "intent" => intent).record(elapsed.as_secs_f64());
}

pub fn record_gateway_call(operation: &'static str, outcome: &'static str) {
    counter!(GATEWAY_CALLS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
}
