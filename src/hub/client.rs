//! The reporting client: options, sampling and hand-off to a sink.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::hub::{Hub, Scope};
use crate::observability::metrics;
use crate::protocol::{Envelope, Event, EventId, Transaction};
use crate::sink::Sink;

/// Options shaping every event a [`Client`] sends.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub environment: Option<String>,
    pub release: Option<String>,
    pub server_name: Option<String>,
    /// Fraction of error events to send, `0.0..=1.0`.
    pub sample_rate: f32,
    /// Fraction of new traces to record, `0.0..=1.0`.
    pub traces_sample_rate: f32,
    /// Attach cookies, auth headers and client addresses to events.
    pub send_default_pii: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            environment: None,
            release: None,
            server_name: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
            send_default_pii: false,
        }
    }
}

/// Sends events and transactions to a [`Sink`].
pub struct Client {
    options: ClientOptions,
    sink: Arc<dyn Sink>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(options: ClientOptions, sink: Arc<dyn Sink>) -> Self {
        Self { options, sink }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Enrich `event` with `scope` and the client options and queue it.
    ///
    /// Returns `None` when the event is sampled out.
    pub fn capture_event(&self, mut event: Event, scope: Option<&Scope>) -> Option<EventId> {
        if !sample(self.options.sample_rate) {
            tracing::debug!(event_id = %event.event_id, "Event dropped by sample rate");
            metrics::record_envelope_dropped("sampled_out");
            return None;
        }

        if let Some(scope) = scope {
            scope.apply_to_event(&mut event);
        }
        if event.environment.is_none() {
            event.environment = self.options.environment.clone();
        }
        if event.release.is_none() {
            event.release = self.options.release.clone();
        }
        if event.server_name.is_none() {
            event.server_name = self.options.server_name.clone();
        }

        let event_id = event.event_id;
        let envelope = Envelope::Event(Box::new(event));
        metrics::record_envelope_sent(envelope.kind());
        self.sink.send(envelope);
        Some(event_id)
    }

    pub(crate) fn send_transaction(&self, transaction: Transaction) {
        let envelope = Envelope::Transaction(Box::new(transaction));
        metrics::record_envelope_sent(envelope.kind());
        self.sink.send(envelope);
    }

    pub(crate) fn sample_traces(&self) -> bool {
        sample(self.options.traces_sample_rate)
    }

    /// Wait until queued envelopes are delivered or `timeout` elapses.
    ///
    /// Returns `false` on timeout; delivery is not cancelled.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let delivered = self.sink.flush(timeout).await;
        if !delivered {
            metrics::record_flush_timeout();
        }
        delivered
    }
}

fn sample(rate: f32) -> bool {
    if rate >= 1.0 {
        true
    } else if rate <= 0.0 {
        false
    } else {
        rand::random::<f32>() < rate
    }
}

/// Create a client and bind it to [`Hub::main`].
///
/// Requests without a hub of their own get a clone of the main hub, so this
/// is all an application needs before installing the middleware.
pub fn init(options: ClientOptions, sink: Arc<dyn Sink>) -> Arc<Client> {
    let client = Arc::new(Client::new(options, sink));
    Hub::main().bind_client(Some(client.clone()));
    tracing::info!(
        environment = ?client.options.environment,
        release = ?client.options.release,
        "Reporting client initialized"
    );
    client
}
