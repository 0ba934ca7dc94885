//! Request snapshot attached to events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The HTTP request an event happened in.
///
/// Built from the live request by [`crate::http::request::request_info`];
/// this type only carries the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query_string: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cookies: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub env: BTreeMap<String, String>,
}

impl RequestInfo {
    /// Path component of [`RequestInfo::url`].
    pub fn path(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let path = match without_scheme.find('/') {
            Some(idx) if self.url.contains("://") => &without_scheme[idx..],
            Some(_) => without_scheme,
            None => "/",
        };
        path.split('?').next().unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_from_absolute_and_relative_urls() {
        let absolute = RequestInfo {
            url: "http://shop.local/orders/42?expand=items".into(),
            ..Default::default()
        };
        assert_eq!(absolute.path(), "/orders/42");

        let relative = RequestInfo {
            url: "/orders/42".into(),
            ..Default::default()
        };
        assert_eq!(relative.path(), "/orders/42");

        let bare_host = RequestInfo {
            url: "http://shop.local".into(),
            ..Default::default()
        };
        assert_eq!(bare_host.path(), "/");
    }
}
