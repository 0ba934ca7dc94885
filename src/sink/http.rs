//! HTTP delivery to a collector endpoint.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

use crate::observability::metrics;
use crate::protocol::Envelope;
use crate::sink::{InFlight, Sink};

/// Default capacity of the delivery queue.
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Posts each envelope as JSON to `endpoint` from a background task.
///
/// Envelopes are delivered in order, one request at a time. Must be created
/// inside a tokio runtime.
#[derive(Debug)]
pub struct HttpSink {
    endpoint: Url,
    queue: mpsc::Sender<Envelope>,
    in_flight: Arc<InFlight>,
}

impl HttpSink {
    pub fn new(endpoint: Url, queue_size: usize) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, queue_size)
    }

    pub fn with_client(client: reqwest::Client, endpoint: Url, queue_size: usize) -> Self {
        let (queue, rx) = mpsc::channel(queue_size.max(1));
        let in_flight = Arc::new(InFlight::default());

        tokio::spawn(deliver_loop(client, endpoint.clone(), rx, in_flight.clone()));
        tracing::info!(endpoint = %endpoint, queue_size, "HTTP sink started");

        Self {
            endpoint,
            queue,
            in_flight,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

async fn deliver_loop(
    client: reqwest::Client,
    endpoint: Url,
    mut rx: mpsc::Receiver<Envelope>,
    in_flight: Arc<InFlight>,
) {
    while let Some(envelope) = rx.recv().await {
        let kind = envelope.kind();
        match client.post(endpoint.clone()).json(&envelope).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(kind, status = %response.status(), "Envelope delivered");
            }
            Ok(response) => {
                tracing::warn!(kind, status = %response.status(), "Collector rejected envelope");
                metrics::record_envelope_dropped("rejected");
            }
            Err(e) => {
                tracing::warn!(kind, error = %e, "Envelope delivery failed");
                metrics::record_envelope_dropped("network_error");
            }
        }
        in_flight.complete();
    }
    tracing::debug!("HTTP sink queue closed");
}

impl Sink for HttpSink {
    fn send(&self, envelope: Envelope) {
        self.in_flight.begin();
        if let Err(e) = self.queue.try_send(envelope) {
            self.in_flight.complete();
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "queue_full",
                mpsc::error::TrySendError::Closed(_) => "queue_closed",
            };
            tracing::warn!(reason, "Dropping envelope");
            metrics::record_envelope_dropped(reason);
        }
    }

    fn flush(&self, timeout: Duration) -> BoxFuture<'_, bool> {
        Box::pin(self.in_flight.wait_drained(timeout))
    }
}
