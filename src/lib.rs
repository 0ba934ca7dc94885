//! Panic and request-context reporting for axum applications.
//!
//! Install [`http::report_panics`] as a middleware and every request gets a
//! reporting [`Hub`], a timed [`trace::Span`] and, should a handler panic, an
//! error event delivered through a [`sink::Sink`].

pub mod config;
pub mod http;
pub mod hub;
pub mod lifecycle;
pub mod observability;
pub mod protocol;
pub mod sink;
pub mod trace;

pub use config::ReporterConfig;
pub use http::{report_panics, Options, ReportingHandler};
pub use hub::{init, Client, ClientOptions, Hub};
pub use lifecycle::Shutdown;
