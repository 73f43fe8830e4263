//! Metrics collection and exposition.
//!
//! # Metrics
//! - `denyfile_checks_total` (counter): access decisions by outcome
//! - `denyfile_probes_total` (counter): marker lookups performed
//! - `http_requests_total` (counter): responses by method and status
//! - `http_request_duration_seconds` (histogram): latency distribution

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Outcome label of a deny marker check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Declined,
    Denied,
    Disabled,
    Unresolved,
    Error,
}

impl CheckOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckOutcome::Declined => "declined",
            CheckOutcome::Denied => "denied",
            CheckOutcome::Disabled => "disabled",
            CheckOutcome::Unresolved => "unresolved",
            CheckOutcome::Error => "error",
        }
    }
}

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_check(outcome: CheckOutcome) {
    counter!("denyfile_checks_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_probes(probes: u64) {
    counter!("denyfile_probes_total").increment(probes);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("http_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}
