//! Per-hub contextual data applied to every captured event.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::protocol::{Event, RequestInfo, User};
use crate::trace::TraceContext;

/// Data attached to every event captured through a hub.
///
/// Values already present on an event win over scope values.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    request: Option<RequestInfo>,
    user: Option<User>,
    tags: BTreeMap<String, String>,
    extra: BTreeMap<String, Value>,
    transaction: Option<String>,
    trace: Option<TraceContext>,
}

impl Scope {
    pub fn set_request(&mut self, request: Option<RequestInfo>) {
        self.request = request;
    }

    pub fn request(&self) -> Option<&RequestInfo> {
        self.request.as_ref()
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn remove_tag(&mut self, key: &str) {
        self.tags.remove(key);
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn set_transaction(&mut self, name: Option<&str>) {
        self.transaction = name.map(str::to_string);
    }

    pub fn transaction(&self) -> Option<&str> {
        self.transaction.as_deref()
    }

    pub fn set_trace_context(&mut self, trace: Option<TraceContext>) {
        self.trace = trace;
    }

    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.trace.as_ref()
    }

    /// Fill the gaps in `event` with this scope's data.
    pub fn apply_to_event(&self, event: &mut Event) {
        if event.request.is_none() {
            event.request = self.request.clone();
        }
        if event.user.is_none() {
            event.user = self.user.clone();
        }
        if event.transaction.is_none() {
            event.transaction = self.transaction.clone();
        }
        if event.trace.is_none() {
            event.trace = self.trace.clone();
        }
        for (key, value) in &self.tags {
            event.tags.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in &self.extra {
            event.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}
