//! Wire types shipped to the error-tracking service.
//!
//! # Data Flow
//! ```text
//! panic / message
//!     → event.rs (Event, Exception, Level)
//!     → hub scope enrichment (request, tags, trace context)
//!     → Envelope::Event → sink
//!
//! finished request span
//!     → transaction.rs (Transaction)
//!     → Envelope::Transaction → sink
//! ```
//!
//! # Design Decisions
//! - Everything serializes to JSON; sinks never re-encode
//! - Timestamps are fractional Unix seconds
//! - Optional fields are skipped when empty to keep payloads small

pub mod event;
pub mod request;
pub mod transaction;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub use event::{Event, EventId, Exception, Level, Mechanism, User};
pub use request::RequestInfo;
pub use transaction::Transaction;

/// A unit of delivery handed to a [`Sink`](crate::sink::Sink).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Envelope {
    Event(Box<Event>),
    Transaction(Box<Transaction>),
}

impl Envelope {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Event(_) => "event",
            Envelope::Transaction(_) => "transaction",
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Envelope::Event(event) => Some(event),
            Envelope::Transaction(_) => None,
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Envelope::Transaction(transaction) => Some(transaction),
            Envelope::Event(_) => None,
        }
    }
}

/// Current wall-clock time as fractional Unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
