//! Error events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::protocol::{unix_now, RequestInfo};
use crate::trace::TraceContext;

/// Identifier assigned to every captured event.
///
/// Serialized in the same 32-character form it is logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s).map(Self)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EventId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
    Fatal,
}

/// How an exception was caught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanism {
    #[serde(rename = "type")]
    pub ty: String,
    pub handled: bool,
}

/// A single exception (or panic) attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mechanism: Option<Mechanism>,
}

/// The user affected by an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip_address: Option<String>,
}

/// An error event as delivered to the tracking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub timestamp: f64,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exception: Vec<Exception>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request: Option<RequestInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<TraceContext>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_name: Option<String>,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: unix_now(),
            level: Level::Error,
            message: None,
            exception: Vec::new(),
            request: None,
            transaction: None,
            user: None,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            trace: None,
            environment: None,
            release: None,
            server_name: None,
        }
    }
}

impl Event {
    /// Build a plain message event.
    pub fn from_message(message: impl Into<String>, level: Level) -> Self {
        Self {
            message: Some(message.into()),
            level,
            ..Default::default()
        }
    }

    /// Build a fatal event from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = panic_message(payload);
        Self {
            level: Level::Fatal,
            message: Some(message.clone()),
            exception: vec![Exception {
                ty: "panic".to_string(),
                value: Some(message),
                mechanism: Some(Mechanism {
                    ty: "panic".to_string(),
                    handled: false,
                }),
            }],
            ..Default::default()
        }
    }
}

/// Extract a readable message from a panic payload.
///
/// `panic!` produces either a `&'static str` or a `String`; anything raised
/// through `panic_any` with another type is reported opaquely.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
