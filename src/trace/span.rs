//! Request spans.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::hub::Client;
use crate::observability::metrics;
use crate::protocol::{unix_now, EventId, Transaction};
use crate::trace::{SpanId, SpanStatus, TraceContext, TraceHeader, TraceId};

/// A timed record of one request.
///
/// Cheap to clone; every clone refers to the same span. Created through
/// [`Hub::start_span`](crate::hub::Hub::start_span).
#[derive(Debug, Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

#[derive(Debug)]
struct SpanInner {
    client: Option<Arc<Client>>,
    name: String,
    context: TraceContext,
    sampled: bool,
    start_timestamp: f64,
    state: Mutex<SpanState>,
}

#[derive(Debug, Default)]
struct SpanState {
    status: Option<SpanStatus>,
    data: BTreeMap<String, Value>,
    finished: bool,
}

impl Span {
    pub(crate) fn start(
        client: Option<Arc<Client>>,
        op: &str,
        name: &str,
        continuation: Option<TraceHeader>,
        sampled: bool,
    ) -> Self {
        let context = match continuation {
            Some(header) => TraceContext {
                trace_id: header.trace_id,
                span_id: SpanId::random(),
                parent_span_id: Some(header.parent_span_id),
                op: op.to_string(),
            },
            None => TraceContext {
                trace_id: TraceId::random(),
                span_id: SpanId::random(),
                parent_span_id: None,
                op: op.to_string(),
            },
        };
        tracing::trace!(
            name,
            trace_id = %context.trace_id,
            span_id = %context.span_id,
            sampled,
            "Span started"
        );
        Self {
            inner: Arc::new(SpanInner {
                client,
                name: name.to_string(),
                context,
                sampled,
                start_timestamp: unix_now(),
                state: Mutex::new(SpanState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn trace_context(&self) -> &TraceContext {
        &self.inner.context
    }

    pub fn is_sampled(&self) -> bool {
        self.inner.sampled
    }

    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    pub fn status(&self) -> Option<SpanStatus> {
        self.state().status
    }

    /// Set the outcome. Ignored once the span is finished.
    pub fn set_status(&self, status: SpanStatus) {
        let mut state = self.state();
        if !state.finished {
            state.status = Some(status);
        }
    }

    /// Attach a data field. Ignored once the span is finished.
    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.state();
        if !state.finished {
            state.data.insert(key.into(), value.into());
        }
    }

    /// Header value to continue this trace in an outbound request.
    pub fn to_trace_header(&self) -> TraceHeader {
        TraceHeader {
            trace_id: self.inner.context.trace_id,
            parent_span_id: self.inner.context.span_id,
            sampled: Some(self.inner.sampled),
        }
    }

    /// Finish the span, keeping any status already set (default `ok`).
    ///
    /// Returns `false` if the span had already been finished.
    pub fn finish(&self) -> bool {
        self.finish_inner(None)
    }

    /// Finish the span with `status` unless a status was set explicitly.
    pub fn finish_with(&self, status: SpanStatus) -> bool {
        self.finish_inner(Some(status))
    }

    fn finish_inner(&self, fallback: Option<SpanStatus>) -> bool {
        let transaction = {
            let mut state = self.state();
            if state.finished {
                return false;
            }
            state.finished = true;
            let status = *state
                .status
                .get_or_insert(fallback.unwrap_or(SpanStatus::Ok));
            metrics::record_span_finished(status);
            tracing::debug!(
                name = %self.inner.name,
                trace_id = %self.inner.context.trace_id,
                status = %status,
                "Span finished"
            );

            if !self.inner.sampled {
                return true;
            }
            let Some(client) = &self.inner.client else {
                return true;
            };
            let options = client.options();
            Transaction {
                event_id: EventId::new(),
                name: self.inner.name.clone(),
                trace: self.inner.context.clone(),
                status,
                start_timestamp: self.inner.start_timestamp,
                timestamp: unix_now(),
                data: std::mem::take(&mut state.data),
                environment: options.environment.clone(),
                release: options.release.clone(),
            }
        };

        if let Some(client) = &self.inner.client {
            client.send_transaction(transaction);
        }
        true
    }

    fn state(&self) -> MutexGuard<'_, SpanState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Finishes a span on every exit path.
///
/// Call [`SpanGuard::finish`] on the paths that know the outcome; if the
/// guard is dropped instead (the request future was cancelled, or the
/// thread is unwinding), the span is finished as `cancelled` or
/// `internal_error` respectively.
#[derive(Debug)]
pub struct SpanGuard {
    span: Option<Span>,
}

impl SpanGuard {
    pub fn new(span: Span) -> Self {
        Self { span: Some(span) }
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn finish(mut self, status: SpanStatus) {
        if let Some(span) = self.span.take() {
            span.finish_with(status);
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(span) = self.span.take() {
            let status = if std::thread::panicking() {
                SpanStatus::InternalError
            } else {
                SpanStatus::Cancelled
            };
            span.finish_with(status);
        }
    }
}
