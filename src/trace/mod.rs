//! Distributed tracing for inbound requests.
//!
//! # Data Flow
//! ```text
//! inbound headers (sentry-trace / traceparent)
//!     → propagation.rs (TraceHeader)
//!     → Hub::start_span (sampling decision)
//!     → span.rs (Span, guarded by SpanGuard)
//!     → Span::finish → Envelope::Transaction → sink
//! ```
//!
//! # Design Decisions
//! - A span finishes exactly once; later calls are no-ops
//! - Continued traces keep the upstream sampling decision
//! - Malformed trace headers start a fresh trace instead of failing the request

pub mod ids;
pub mod propagation;
pub mod span;
pub mod status;

pub use ids::{SpanId, TraceContext, TraceId};
pub use propagation::{TraceHeader, SENTRY_TRACE_HEADER, TRACEPARENT_HEADER};
pub use span::{Span, SpanGuard};
pub use status::SpanStatus;
