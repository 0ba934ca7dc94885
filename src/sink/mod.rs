//! Delivery of envelopes to the error-tracking service.
//!
//! # Data Flow
//! ```text
//! Client::capture_event / Span::finish
//!     → Sink::send (non-blocking, never fails)
//!     → http.rs: bounded queue → background task → POST JSON
//!     → memory.rs: in-process record (tests, demos)
//!
//! Client::flush(timeout)
//!     → Sink::flush → wait for in-flight count to reach zero
//! ```
//!
//! # Design Decisions
//! - Send never blocks the request; a full queue drops the envelope
//! - Flush only waits; a timed-out flush leaves delivery running
//! - Delivery failures are logged and counted, never surfaced to callers

pub mod http;
pub mod memory;

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub use http::HttpSink;
pub use memory::MemorySink;

use crate::protocol::Envelope;

/// Transport for envelopes.
pub trait Sink: Send + Sync + 'static {
    /// Queue an envelope for delivery. Must not block.
    fn send(&self, envelope: Envelope);

    /// Resolve to `true` once everything queued so far is delivered, or to
    /// `false` when `timeout` elapses first.
    fn flush(&self, timeout: Duration) -> BoxFuture<'_, bool>;
}

/// Counts envelopes accepted but not yet delivered.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    drained: Notify,
}

impl InFlight {
    pub(crate) fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn complete(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_drained(&self, timeout: Duration) -> bool {
        let drained = async {
            loop {
                let notified = self.drained.notified();
                tokio::pin!(notified);
                // Register before checking so a completion in between is not missed.
                notified.as_mut().enable();
                if self.len() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}
