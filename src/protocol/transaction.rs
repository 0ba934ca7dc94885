//! Finished request spans.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::protocol::EventId;
use crate::trace::{SpanStatus, TraceContext};

/// A finished span, shipped so the tracking service can chart request timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub event_id: EventId,
    pub name: String,
    pub trace: TraceContext,
    pub status: SpanStatus,
    pub start_timestamp: f64,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub data: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub release: Option<String>,
}

impl Transaction {
    /// Span duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.timestamp - self.start_timestamp).max(0.0)
    }
}
