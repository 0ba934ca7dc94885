//! HTTP integration.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → middleware.rs (resolve hub, start span, snapshot request)
//!     → request.rs (RequestInfo for the hub scope)
//!     → rest of the handler chain, under catch_unwind
//!     → normal return: finish span with the response status
//!     → panic: finish span, report, optionally wait, re-raise or respond 500
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{report_panics, Options, ReportingHandler, DEFAULT_TIMEOUT};
pub use request::request_info;
pub use server::ReportingServer;
