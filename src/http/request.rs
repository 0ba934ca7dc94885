//! Request snapshots for error events.
//!
//! # Responsibilities
//! - Capture method, URL, query and headers of the inbound request
//! - Strip personally identifiable data unless the client opts in
//!
//! # Design Decisions
//! - Snapshot is taken before the handler runs; the request body is never read
//! - Relative request URIs are made absolute from the `Host` header

use axum::extract::ConnectInfo;
use axum::http::{header, Request};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::protocol::RequestInfo;

/// Headers removed from snapshots unless `send_default_pii` is set.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-forwarded-for",
    "x-real-ip",
];

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_HEADERS.contains(&name)
}

/// Build the [`RequestInfo`] attached to events raised while handling `request`.
pub fn request_info<B>(request: &Request<B>, send_default_pii: bool) -> RequestInfo {
    let uri = request.uri();
    let url = match (uri.scheme(), request.headers().get(header::HOST)) {
        (None, Some(host)) => match host.to_str() {
            Ok(host) => format!(
                "http://{}{}",
                host,
                uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
            ),
            Err(_) => uri.to_string(),
        },
        _ => uri.to_string(),
    };

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in request.headers() {
        if !send_default_pii && is_sensitive(name.as_str()) {
            continue;
        }
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let mut info = RequestInfo {
        url,
        method: request.method().to_string(),
        query_string: uri.query().map(str::to_string),
        headers,
        ..Default::default()
    };

    if send_default_pii {
        let cookies: Vec<&str> = request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !cookies.is_empty() {
            info.cookies = Some(cookies.join("; "));
        }
        if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
            info.env.insert("REMOTE_ADDR".to_string(), addr.ip().to_string());
        }
    }

    info
}
