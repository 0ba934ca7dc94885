//! Reporting sessions.
//!
//! # Data Flow
//! ```text
//! init() binds a Client to Hub::main()
//!
//! per request:
//!     request extensions → Arc<Hub>   (or Hub::new_from_top(default))
//!     → Scope (request, tags, trace context)
//!     → Hub::capture_* → Client (sampling, options)
//!     → Sink
//! ```
//!
//! # Design Decisions
//! - A hub is passed explicitly through request extensions, never looked up
//!   from thread-local state
//! - Cloning a hub copies the scope; the client is shared
//! - A hub without a client captures nothing and reports no event id

pub mod client;
pub mod scope;

use arc_swap::ArcSwapOption;
use std::any::Any;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Duration;

pub use client::{init, Client, ClientOptions};
pub use scope::Scope;

use crate::observability::metrics;
use crate::protocol::{Event, EventId, Level, RequestInfo};
use crate::trace::{Span, TraceHeader};

static MAIN_HUB: OnceLock<Arc<Hub>> = OnceLock::new();

/// Handle to a reporting session: a client plus the scope its events carry.
#[derive(Debug)]
pub struct Hub {
    client: ArcSwapOption<Client>,
    scope: RwLock<Scope>,
    last_event_id: Mutex<Option<EventId>>,
}

impl Hub {
    pub fn new(client: Option<Arc<Client>>, scope: Scope) -> Self {
        Self {
            client: ArcSwapOption::new(client),
            scope: RwLock::new(scope),
            last_event_id: Mutex::new(None),
        }
    }

    /// The process-wide default hub.
    ///
    /// Starts without a client; [`init`] binds one.
    pub fn main() -> Arc<Hub> {
        MAIN_HUB
            .get_or_init(|| Arc::new(Hub::new(None, Scope::default())))
            .clone()
    }

    /// A new hub sharing `other`'s client, with a copy of its scope.
    pub fn new_from_top(other: &Hub) -> Self {
        Self::new(other.client(), other.scope())
    }

    pub fn client(&self) -> Option<Arc<Client>> {
        self.client.load_full()
    }

    pub fn bind_client(&self, client: Option<Arc<Client>>) {
        self.client.store(client);
    }

    /// Snapshot of the current scope.
    pub fn scope(&self) -> Scope {
        self.scope
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn configure_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Scope) -> R,
    {
        let mut scope = self.scope.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut scope)
    }

    /// Whether events may carry personally identifiable request data.
    pub fn send_default_pii(&self) -> bool {
        self.client()
            .is_some_and(|client| client.options().send_default_pii)
    }

    /// Start a span and make it the scope's active trace context.
    ///
    /// An upstream sampling decision in `continuation` is honoured; otherwise
    /// the client's `traces_sample_rate` decides.
    pub fn start_span(&self, op: &str, name: &str, continuation: Option<TraceHeader>) -> Span {
        let client = self.client();
        let sampled = match continuation.and_then(|header| header.sampled) {
            Some(sampled) => sampled,
            None => client.as_ref().is_some_and(|client| client.sample_traces()),
        };
        let span = Span::start(client, op, name, continuation, sampled);
        self.configure_scope(|scope| {
            scope.set_transaction(Some(name));
            scope.set_trace_context(Some(span.trace_context().clone()));
        });
        span
    }

    pub fn capture_event(&self, event: Event) -> Option<EventId> {
        let client = self.client()?;
        let scope = self.scope();
        let event_id = client.capture_event(event, Some(&scope))?;
        *self
            .last_event_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(event_id);
        Some(event_id)
    }

    pub fn capture_message(&self, message: impl Into<String>, level: Level) -> Option<EventId> {
        self.capture_event(Event::from_message(message, level))
    }

    /// Report a caught panic, attaching `request` to the event.
    ///
    /// Only panics that produced an event are counted.
    pub fn capture_panic(
        &self,
        payload: &(dyn Any + Send),
        request: Option<RequestInfo>,
    ) -> Option<EventId> {
        let mut event = Event::from_panic(payload);
        event.request = request;
        let event_id = self.capture_event(event)?;
        metrics::record_panic_captured();
        Some(event_id)
    }

    pub fn last_event_id(&self) -> Option<EventId> {
        *self
            .last_event_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for the bound client's sink to drain, up to `timeout`.
    ///
    /// Returns `true` straight away when no client is bound.
    pub async fn flush(&self, timeout: Duration) -> bool {
        match self.client() {
            Some(client) => client.flush(timeout).await,
            None => true,
        }
    }
}
