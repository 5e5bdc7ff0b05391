//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ecg_uploads_total` (counter): uploads received, by method
//! - `ecg_pdf_extracted_total` (counter): embedded reports recovered
//! - `ecg_extraction_malformed_total` (counter): corrupt embedded encodings
//! - `ecg_storage_failures_total` (counter): failed writes, by kind
//! - `ecg_responses_total` (counter): responses sent, by status
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_upload(method: &str) {
    counter!("ecg_uploads_total", "method" => method.to_string()).increment(1);
}

pub fn record_pdf_extracted() {
    counter!("ecg_pdf_extracted_total").increment(1);
}

pub fn record_malformed_extraction() {
    counter!("ecg_extraction_malformed_total").increment(1);
}

pub fn record_storage_failure(kind: &'static str) {
    counter!("ecg_storage_failures_total", "kind" => kind).increment(1);
}

pub fn record_response(status: u16) {
    counter!("ecg_responses_total", "status" => status.to_string()).increment(1);
}
