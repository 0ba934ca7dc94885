//! Metrics collection and exposition.
//!
//! # Metrics
//! - `reporter_panics_captured_total` (counter): panics reported as events
//! - `reporter_events_sent_total` (counter): envelopes handed to the sink, by kind
//! - `reporter_envelopes_dropped_total` (counter): envelopes lost, by reason
//! - `reporter_spans_finished_total` (counter): finished request spans, by status
//! - `reporter_flush_timeouts_total` (counter): flushes that hit their deadline
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are static strings to keep cardinality bounded

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use crate::trace::SpanStatus;

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_panic_captured() {
    ::metrics::counter!("reporter_panics_captured_total").increment(1);
}

pub fn record_envelope_sent(kind: &'static str) {
    ::metrics::counter!("reporter_events_sent_total", "kind" => kind).increment(1);
}

pub fn record_envelope_dropped(reason: &'static str) {
    ::metrics::counter!("reporter_envelopes_dropped_total", "reason" => reason).increment(1);
}

pub fn record_span_finished(status: SpanStatus) {
    ::metrics::counter!("reporter_spans_finished_total", "status" => status.as_str()).increment(1);
}

pub fn record_flush_timeout() {
    ::metrics::counter!("reporter_flush_timeouts_total").increment(1);
}
