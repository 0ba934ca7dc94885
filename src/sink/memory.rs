//! In-process sink.
//!
//! Records every delivered envelope. Delivery can be delayed or stalled to
//! exercise `wait_for_delivery` behaviour without a network.

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::protocol::{Envelope, Event, Transaction};
use crate::sink::{InFlight, Sink};

#[derive(Debug, Clone, Copy)]
enum Delivery {
    Immediate,
    Delayed(Duration),
    Stalled,
}

#[derive(Debug)]
pub struct MemorySink {
    delivery: Delivery,
    accepted: AtomicUsize,
    delivered: Arc<Mutex<Vec<Envelope>>>,
    in_flight: Arc<InFlight>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// A sink that delivers synchronously inside `send`.
    pub fn new() -> Self {
        Self::with_delivery(Delivery::Immediate)
    }

    /// A sink that delivers each envelope `delay` after it was sent.
    ///
    /// Needs a tokio runtime; without one, delivery is immediate.
    pub fn with_delivery_delay(delay: Duration) -> Self {
        Self::with_delivery(Delivery::Delayed(delay))
    }

    /// A sink that accepts envelopes but never delivers them.
    pub fn stalled() -> Self {
        Self::with_delivery(Delivery::Stalled)
    }

    fn with_delivery(delivery: Delivery) -> Self {
        Self {
            delivery,
            accepted: AtomicUsize::new(0),
            delivered: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Number of envelopes handed to [`Sink::send`].
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Number of envelopes accepted but not yet delivered.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.envelopes()
            .iter()
            .filter_map(Envelope::as_event)
            .cloned()
            .collect()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.envelopes()
            .iter()
            .filter_map(Envelope::as_transaction)
            .cloned()
            .collect()
    }
}

fn deliver(delivered: &Mutex<Vec<Envelope>>, envelope: Envelope) {
    tracing::debug!(kind = envelope.kind(), "Envelope delivered to memory sink");
    delivered
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(envelope);
}

impl Sink for MemorySink {
    fn send(&self, envelope: Envelope) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        match self.delivery {
            Delivery::Immediate => deliver(&self.delivered, envelope),
            Delivery::Stalled => self.in_flight.begin(),
            Delivery::Delayed(delay) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    self.in_flight.begin();
                    let delivered = self.delivered.clone();
                    let in_flight = self.in_flight.clone();
                    handle.spawn(async move {
                        tokio::time::sleep(delay).await;
                        deliver(&delivered, envelope);
                        in_flight.complete();
                    });
                }
                Err(_) => deliver(&self.delivered, envelope),
            },
        }
    }

    fn flush(&self, timeout: Duration) -> BoxFuture<'_, bool> {
        Box::pin(self.in_flight.wait_drained(timeout))
    }
}
