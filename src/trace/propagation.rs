//! Trace continuation from inbound request headers.
//!
//! Two formats are understood:
//! - `sentry-trace: <trace_id>-<span_id>[-<sampled>]`
//! - `traceparent: 00-<trace_id>-<span_id>-<flags>` (W3C Trace Context)
//!
//! `sentry-trace` wins when both are present.

use axum::http::HeaderMap;
use std::fmt;

use crate::trace::{SpanId, TraceId};

pub const SENTRY_TRACE_HEADER: &str = "sentry-trace";
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Upstream trace position extracted from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceHeader {
    pub trace_id: TraceId,
    pub parent_span_id: SpanId,
    /// Upstream sampling decision, if the caller made one.
    pub sampled: Option<bool>,
}

impl TraceHeader {
    /// Extract a trace continuation from request headers, if any is valid.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        header(SENTRY_TRACE_HEADER)
            .and_then(Self::parse_sentry_trace)
            .or_else(|| header(TRACEPARENT_HEADER).and_then(Self::parse_traceparent))
    }

    pub fn parse_sentry_trace(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let trace_id = parts.next()?.parse().ok()?;
        let parent_span_id = parts.next()?.parse().ok()?;
        let sampled = match parts.next() {
            None => None,
            Some("1") => Some(true),
            Some("0") => Some(false),
            Some(_) => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            trace_id,
            parent_span_id,
            sampled,
        })
    }

    pub fn parse_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        // Version ff is forbidden; future versions may append fields.
        if version.len() != 2 || version.eq_ignore_ascii_case("ff") {
            return None;
        }
        let trace_id = parts.next()?.parse().ok()?;
        let parent_span_id = parts.next()?.parse().ok()?;
        let flags = parts.next()?;
        if flags.len() != 2 {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;
        if version == "00" && parts.next().is_some() {
            return None;
        }
        Some(Self {
            trace_id,
            parent_span_id,
            sampled: Some(flags & 0x01 == 0x01),
        })
    }
}

/// Renders the `sentry-trace` header value.
impl fmt::Display for TraceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.trace_id, self.parent_span_id)?;
        match self.sampled {
            Some(true) => write!(f, "-1"),
            Some(false) => write!(f, "-0"),
            None => Ok(()),
        }
    }
}
